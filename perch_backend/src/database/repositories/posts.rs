use crate::database::models::{PostDetailRecord, PostRecord, UserRecord};
use crate::pagination::Cursor;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

// ?1 is always the viewer (nullable) so the EXISTS flags collapse to
// false for anonymous reads.
const DETAIL_QUERY: &str = r#"
    SELECT p.id, p.user_id, p.content, p.media_url, p.media_kind, p.created_at,
           u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
           (SELECT COUNT(*) FROM reposts r WHERE r.post_id = p.id),
           EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1),
           EXISTS(SELECT 1 FROM reposts r WHERE r.post_id = p.id AND r.user_id = ?1)
    FROM posts p
    INNER JOIN users u ON u.id = p.user_id
"#;

fn map_detail(row: &Row<'_>) -> rusqlite::Result<PostDetailRecord> {
    Ok(PostDetailRecord {
        post: PostRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            content: row.get(2)?,
            media_url: row.get(3)?,
            media_kind: row.get(4)?,
            created_at: row.get(5)?,
        },
        author: UserRecord {
            id: row.get(6)?,
            username: row.get(7)?,
            display_name: row.get(8)?,
            avatar_url: row.get(9)?,
            bio: row.get(10)?,
            verified: row.get(11)?,
            created_at: row.get(12)?,
        },
        like_count: row.get(13)?,
        comment_count: row.get(14)?,
        repost_count: row.get(15)?,
        liked_by_viewer: row.get(16)?,
        reposted_by_viewer: row.get(17)?,
    })
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO posts (id, user_id, content, media_url, media_kind, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.user_id,
                record.content,
                record.media_url,
                record.media_kind,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, content, media_url, media_kind, created_at
                FROM posts
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(PostRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        content: row.get(2)?,
                        media_url: row.get(3)?,
                        media_kind: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_detail(&self, id: &str, viewer: Option<&str>) -> Result<Option<PostDetailRecord>> {
        let query = format!("{DETAIL_QUERY} WHERE p.id = ?2");
        Ok(self
            .conn
            .query_row(&query, params![viewer, id], map_detail)
            .optional()?)
    }

    fn page_recent(
        &self,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<PostDetailRecord>> {
        let query = format!(
            r#"{DETAIL_QUERY}
            WHERE (?2 IS NULL OR p.created_at < ?2 OR (p.created_at = ?2 AND p.id <= ?3))
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?4
            "#
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(
            params![
                viewer,
                cursor.map(|c| c.created_at),
                cursor.map(|c| c.id.as_str()),
                limit + 1
            ],
            map_detail,
        )?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn page_by_author(
        &self,
        author_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<PostDetailRecord>> {
        let query = format!(
            r#"{DETAIL_QUERY}
            WHERE p.user_id = ?2
              AND (?3 IS NULL OR p.created_at < ?3 OR (p.created_at = ?3 AND p.id <= ?4))
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?5
            "#
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(
            params![
                viewer,
                author_id,
                cursor.map(|c| c.created_at),
                cursor.map(|c| c.id.as_str()),
                limit + 1
            ],
            map_detail,
        )?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count_since(&self, user_id: &str, since: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND created_at >= ?2",
            params![user_id, since],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
