use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub(super) struct SqliteFollowRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        bio: row.get(4)?,
        verified: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl<'conn> super::FollowRepository for SqliteFollowRepository<'conn> {
    fn add(&self, follower_id: &str, followee_id: &str, created_at: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![follower_id, followee_id, created_at],
        )?;
        Ok(inserted == 1)
    }

    fn remove(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?;
        Ok(deleted == 1)
    }

    fn followers_of(&self, user_id: &str) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM follows f
            INNER JOIN users u ON u.id = f.follower_id
            WHERE f.followee_id = ?1
              AND u.username IS NOT NULL
            ORDER BY f.created_at DESC, u.id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], map_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn following_of(&self, user_id: &str) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM follows f
            INNER JOIN users u ON u.id = f.followee_id
            WHERE f.follower_id = ?1
              AND u.username IS NOT NULL
            ORDER BY f.created_at DESC, u.id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], map_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
