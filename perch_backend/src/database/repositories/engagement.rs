use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteEngagementRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> SqliteEngagementRepository<'conn> {
    fn insert_join_row(
        &self,
        table: &str,
        target_column: &str,
        user_id: &str,
        target_id: &str,
        created_at: i64,
    ) -> Result<bool> {
        let query = format!(
            "INSERT OR IGNORE INTO {table} (user_id, {target_column}, created_at) VALUES (?1, ?2, ?3)"
        );
        let inserted = self
            .conn
            .execute(&query, params![user_id, target_id, created_at])?;
        Ok(inserted == 1)
    }

    fn delete_join_row(
        &self,
        table: &str,
        target_column: &str,
        user_id: &str,
        target_id: &str,
    ) -> Result<bool> {
        let query = format!("DELETE FROM {table} WHERE user_id = ?1 AND {target_column} = ?2");
        let deleted = self.conn.execute(&query, params![user_id, target_id])?;
        Ok(deleted == 1)
    }
}

impl<'conn> super::EngagementRepository for SqliteEngagementRepository<'conn> {
    fn add_post_like(&self, user_id: &str, post_id: &str, created_at: i64) -> Result<bool> {
        self.insert_join_row("post_likes", "post_id", user_id, post_id, created_at)
    }

    fn remove_post_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.delete_join_row("post_likes", "post_id", user_id, post_id)
    }

    fn add_comment_like(&self, user_id: &str, comment_id: &str, created_at: i64) -> Result<bool> {
        self.insert_join_row("comment_likes", "comment_id", user_id, comment_id, created_at)
    }

    fn remove_comment_like(&self, user_id: &str, comment_id: &str) -> Result<bool> {
        self.delete_join_row("comment_likes", "comment_id", user_id, comment_id)
    }

    fn add_repost(&self, user_id: &str, post_id: &str, created_at: i64) -> Result<bool> {
        self.insert_join_row("reposts", "post_id", user_id, post_id, created_at)
    }

    fn remove_repost(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.delete_join_row("reposts", "post_id", user_id, post_id)
    }

    fn add_comment_repost(
        &self,
        user_id: &str,
        comment_id: &str,
        created_at: i64,
    ) -> Result<bool> {
        self.insert_join_row(
            "comment_reposts",
            "comment_id",
            user_id,
            comment_id,
            created_at,
        )
    }

    fn remove_comment_repost(&self, user_id: &str, comment_id: &str) -> Result<bool> {
        self.delete_join_row("comment_reposts", "comment_id", user_id, comment_id)
    }

    fn post_likers(&self, post_id: &str) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM post_likes l
            INNER JOIN users u ON u.id = l.user_id
            WHERE l.post_id = ?1
            ORDER BY l.created_at DESC, u.id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
                avatar_url: row.get(3)?,
                bio: row.get(4)?,
                verified: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
