use crate::database::models::{UserProfileRecord, UserRecord};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
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

fn map_profile(row: &Row<'_>) -> rusqlite::Result<UserProfileRecord> {
    Ok(UserProfileRecord {
        user: map_user(row)?,
        follower_count: row.get(7)?,
        following_count: row.get(8)?,
        post_count: row.get(9)?,
        followed_by_viewer: row.get(10)?,
    })
}

const PROFILE_QUERY: &str = r#"
    SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at,
           (SELECT COUNT(*) FROM follows f WHERE f.followee_id = u.id),
           (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id),
           (SELECT COUNT(*) FROM posts p WHERE p.user_id = u.id),
           EXISTS(SELECT 1 FROM follows f WHERE f.follower_id = ?2 AND f.followee_id = u.id)
    FROM users u
"#;

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, username, display_name, avatar_url, bio, verified, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.username,
                record.display_name,
                record.avatar_url,
                record.bio,
                record.verified,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, username, display_name, avatar_url, bio, verified, created_at
                FROM users
                WHERE id = ?1
                "#,
                params![id],
                map_user,
            )
            .optional()?)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, username, display_name, avatar_url, bio, verified, created_at
                FROM users
                WHERE username = ?1
                "#,
                params![username],
                map_user,
            )
            .optional()?)
    }

    fn username_taken(&self, username: &str) -> Result<bool> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn set_username(&self, id: &str, username: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET username = ?2 WHERE id = ?1",
            params![id, username],
        )?;
        Ok(())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, username, display_name, avatar_url, bio, verified, created_at
            FROM users
            WHERE username IS NOT NULL
              AND (instr(lower(username), lower(?1)) > 0
                   OR instr(lower(display_name), lower(?1)) > 0)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![query, limit], map_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn recommended(&self, viewer: Option<&str>, limit: usize) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM users u
            WHERE u.username IS NOT NULL
              AND (?1 IS NULL OR u.id <> ?1)
            ORDER BY (SELECT COUNT(*) FROM follows f WHERE f.followee_id = u.id) DESC,
                     u.created_at DESC, u.id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![viewer, limit], map_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn profile(&self, id: &str, viewer: Option<&str>) -> Result<Option<UserProfileRecord>> {
        let query = format!("{PROFILE_QUERY} WHERE u.id = ?1");
        Ok(self
            .conn
            .query_row(&query, params![id, viewer], map_profile)
            .optional()?)
    }

    fn profile_by_username(
        &self,
        username: &str,
        viewer: Option<&str>,
    ) -> Result<Option<UserProfileRecord>> {
        let query = format!("{PROFILE_QUERY} WHERE u.username = ?1");
        Ok(self
            .conn
            .query_row(&query, params![username, viewer], map_profile)
            .optional()?)
    }
}
