use crate::database::models::AlertRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteAlertRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::AlertRepository for SqliteAlertRepository<'conn> {
    fn create(&self, record: &AlertRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO alerts (id, content, visible, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![record.id, record.content, record.visible, record.created_at],
        )?;
        Ok(())
    }

    fn latest_visible(&self) -> Result<Option<AlertRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, content, visible, created_at
                FROM alerts
                WHERE visible = 1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                [],
                |row| {
                    Ok(AlertRecord {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        visible: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }
}
