use crate::database::models::{CommentDetailRecord, CommentRecord, UserRecord};
use crate::pagination::Cursor;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

// ?1 is always the viewer (nullable), as in the post detail query.
const DETAIL_QUERY: &str = r#"
    SELECT c.id, c.post_id, c.parent_id, c.user_id, c.content, c.created_at,
           u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at,
           (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id),
           (SELECT COUNT(*) FROM comment_reposts r WHERE r.comment_id = c.id),
           EXISTS(SELECT 1 FROM comment_likes l WHERE l.comment_id = c.id AND l.user_id = ?1),
           EXISTS(SELECT 1 FROM comment_reposts r WHERE r.comment_id = c.id AND r.user_id = ?1)
    FROM comments c
    INNER JOIN users u ON u.id = c.user_id
"#;

fn map_detail(row: &Row<'_>) -> rusqlite::Result<CommentDetailRecord> {
    Ok(CommentDetailRecord {
        comment: CommentRecord {
            id: row.get(0)?,
            post_id: row.get(1)?,
            parent_id: row.get(2)?,
            user_id: row.get(3)?,
            content: row.get(4)?,
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
        repost_count: row.get(14)?,
        liked_by_viewer: row.get(15)?,
        reposted_by_viewer: row.get(16)?,
    })
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &CommentRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO comments (id, post_id, parent_id, user_id, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.post_id,
                record.parent_id,
                record.user_id,
                record.content,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, parent_id, user_id, content, created_at
                FROM comments
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok(CommentRecord {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        parent_id: row.get(2)?,
                        user_id: row.get(3)?,
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_detail(&self, id: &str, viewer: Option<&str>) -> Result<Option<CommentDetailRecord>> {
        let query = format!("{DETAIL_QUERY} WHERE c.id = ?2");
        Ok(self
            .conn
            .query_row(&query, params![viewer, id], map_detail)
            .optional()?)
    }

    fn page_top_level(
        &self,
        post_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<CommentDetailRecord>> {
        let query = format!(
            r#"{DETAIL_QUERY}
            WHERE c.post_id = ?2
              AND c.parent_id IS NULL
              AND (?3 IS NULL OR c.created_at < ?3 OR (c.created_at = ?3 AND c.id <= ?4))
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?5
            "#
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(
            params![
                viewer,
                post_id,
                cursor.map(|c| c.created_at),
                cursor.map(|c| c.id.as_str()),
                limit + 1
            ],
            map_detail,
        )?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn page_by_user(
        &self,
        user_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<CommentDetailRecord>> {
        let query = format!(
            r#"{DETAIL_QUERY}
            WHERE c.user_id = ?2
              AND (?3 IS NULL OR c.created_at < ?3 OR (c.created_at = ?3 AND c.id <= ?4))
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?5
            "#
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(
            params![
                viewer,
                user_id,
                cursor.map(|c| c.created_at),
                cursor.map(|c| c.id.as_str()),
                limit + 1
            ],
            map_detail,
        )?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    fn children_of(&self, parent_id: &str) -> Result<Vec<(CommentRecord, UserRecord)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.post_id, c.parent_id, c.user_id, c.content, c.created_at,
                   u.id, u.username, u.display_name, u.avatar_url, u.bio, u.verified, u.created_at
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.parent_id = ?1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![parent_id], |row| {
            Ok((
                CommentRecord {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    user_id: row.get(3)?,
                    content: row.get(4)?,
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
        })?;
        let mut children = Vec::new();
        for row in rows {
            children.push(row?);
        }
        Ok(children)
    }
}
