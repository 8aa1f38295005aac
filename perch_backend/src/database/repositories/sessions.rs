use crate::database::models::SessionRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteSessionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::SessionRepository for SqliteSessionRepository<'conn> {
    fn create(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (token_hash, user_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.token_hash, record.user_id, record.created_at],
        )?;
        Ok(())
    }

    fn user_id_for_token_hash(&self, token_hash: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token_hash = ?1",
                params![token_hash],
                |row| row.get(0),
            )
            .optional()?)
    }
}
