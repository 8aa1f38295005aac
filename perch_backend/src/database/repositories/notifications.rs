use crate::database::models::{NotificationRecord, UserRecord};
use crate::pagination::Cursor;
use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteNotificationRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::NotificationRepository for SqliteNotificationRepository<'conn> {
    fn record(&self, record: &NotificationRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO notifications (id, user_id, sender_id, kind, post_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.user_id,
                record.sender_id,
                record.kind,
                record.post_id,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn page_for_user(
        &self,
        user_id: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<(NotificationRecord, UserRecord)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT n.id, n.user_id, n.sender_id, n.kind, n.post_id, n.created_at,
                   u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM notifications n
            INNER JOIN users u ON u.id = n.sender_id
            WHERE n.user_id = ?1
              AND (?2 IS NULL OR n.created_at < ?2 OR (n.created_at = ?2 AND n.id <= ?3))
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ?4
            "#,
        )?;
        let rows = stmt.query_map(
            params![
                user_id,
                cursor.map(|c| c.created_at),
                cursor.map(|c| c.id.as_str()),
                limit + 1
            ],
            |row| {
                Ok((
                    NotificationRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        kind: row.get(3)?,
                        post_id: row.get(4)?,
                        created_at: row.get(5)?,
                    },
                    UserRecord {
                        id: row.get(6)?,
                        username: row.get(7)?,
                        display_name: row.get(8)?,
                        avatar_url: row.get(9)?,
                        bio: row.get(10)?,
                        verified: row.get(11)?,
                        created_at: row.get(12)?,
                    },
                ))
            },
        )?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}
