mod alerts;
mod comments;
mod engagement;
mod follows;
mod notifications;
mod posts;
mod sessions;
mod users;

use super::models::{
    AlertRecord, CommentDetailRecord, CommentRecord, NotificationRecord, PostDetailRecord,
    PostRecord, SessionRecord, UserProfileRecord, UserRecord,
};
use crate::pagination::Cursor;
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    fn username_taken(&self, username: &str) -> Result<bool>;
    fn set_username(&self, id: &str, username: &str) -> Result<()>;
    fn search(&self, query: &str, limit: usize) -> Result<Vec<UserRecord>>;
    fn recommended(&self, viewer: Option<&str>, limit: usize) -> Result<Vec<UserRecord>>;
    fn profile(&self, id: &str, viewer: Option<&str>) -> Result<Option<UserProfileRecord>>;
    fn profile_by_username(
        &self,
        username: &str,
        viewer: Option<&str>,
    ) -> Result<Option<UserProfileRecord>>;
}

pub trait SessionRepository {
    fn create(&self, record: &SessionRecord) -> Result<()>;
    fn user_id_for_token_hash(&self, token_hash: &str) -> Result<Option<String>>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    fn get_detail(&self, id: &str, viewer: Option<&str>) -> Result<Option<PostDetailRecord>>;
    /// Fetches up to `limit + 1` rows; the caller folds the overflow row
    /// into the next-page cursor.
    fn page_recent(
        &self,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<PostDetailRecord>>;
    fn page_by_author(
        &self,
        author_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<PostDetailRecord>>;
    fn count_since(&self, user_id: &str, since: i64) -> Result<i64>;
}

pub trait CommentRepository {
    fn create(&self, record: &CommentRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<CommentRecord>>;
    fn get_detail(&self, id: &str, viewer: Option<&str>) -> Result<Option<CommentDetailRecord>>;
    fn page_top_level(
        &self,
        post_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<CommentDetailRecord>>;
    fn page_by_user(
        &self,
        user_id: &str,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<CommentDetailRecord>>;
    /// Direct replies in oldest-first order, each with its author. Children
    /// carry no engagement detail of their own.
    fn children_of(&self, parent_id: &str) -> Result<Vec<(CommentRecord, UserRecord)>>;
}

/// Join rows for likes and reposts. `add_*` reports whether a row was
/// actually inserted, `remove_*` whether one was actually deleted, which
/// is what makes the service-level toggles atomic.
pub trait EngagementRepository {
    fn add_post_like(&self, user_id: &str, post_id: &str, created_at: i64) -> Result<bool>;
    fn remove_post_like(&self, user_id: &str, post_id: &str) -> Result<bool>;
    fn add_comment_like(&self, user_id: &str, comment_id: &str, created_at: i64) -> Result<bool>;
    fn remove_comment_like(&self, user_id: &str, comment_id: &str) -> Result<bool>;
    fn add_repost(&self, user_id: &str, post_id: &str, created_at: i64) -> Result<bool>;
    fn remove_repost(&self, user_id: &str, post_id: &str) -> Result<bool>;
    fn add_comment_repost(&self, user_id: &str, comment_id: &str, created_at: i64)
        -> Result<bool>;
    fn remove_comment_repost(&self, user_id: &str, comment_id: &str) -> Result<bool>;
    fn post_likers(&self, post_id: &str) -> Result<Vec<UserRecord>>;
}

pub trait FollowRepository {
    fn add(&self, follower_id: &str, followee_id: &str, created_at: i64) -> Result<bool>;
    fn remove(&self, follower_id: &str, followee_id: &str) -> Result<bool>;
    fn followers_of(&self, user_id: &str) -> Result<Vec<UserRecord>>;
    fn following_of(&self, user_id: &str) -> Result<Vec<UserRecord>>;
}

pub trait NotificationRepository {
    fn record(&self, record: &NotificationRecord) -> Result<()>;
    fn page_for_user(
        &self,
        user_id: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<(NotificationRecord, UserRecord)>>;
}

pub trait AlertRepository {
    fn create(&self, record: &AlertRecord) -> Result<()>;
    fn latest_visible(&self) -> Result<Option<AlertRecord>>;
}

/// Thin wrapper handing out rusqlite-backed repository implementations.
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn sessions(&self) -> impl SessionRepository + '_ {
        sessions::SqliteSessionRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn engagement(&self) -> impl EngagementRepository + '_ {
        engagement::SqliteEngagementRepository { conn: self.conn }
    }

    pub fn follows(&self) -> impl FollowRepository + '_ {
        follows::SqliteFollowRepository { conn: self.conn }
    }

    pub fn notifications(&self) -> impl NotificationRepository + '_ {
        notifications::SqliteNotificationRepository { conn: self.conn }
    }

    pub fn alerts(&self) -> impl AlertRepository + '_ {
        alerts::SqliteAlertRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("migrations");
        conn
    }

    fn user(id: &str, username: Option<&str>, created_at: i64) -> UserRecord {
        UserRecord {
            id: id.into(),
            username: username.map(String::from),
            display_name: format!("user {id}"),
            avatar_url: None,
            bio: None,
            verified: false,
            created_at,
        }
    }

    fn post(id: &str, user_id: &str, created_at: i64) -> PostRecord {
        PostRecord {
            id: id.into(),
            user_id: user_id.into(),
            content: format!("post {id}"),
            media_url: None,
            media_kind: None,
            created_at,
        }
    }

    #[test]
    fn post_and_comment_repositories_assemble_details() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        repos.users().create(&user("u-a", Some("alice"), 100)).unwrap();
        repos.users().create(&user("u-b", Some("bob"), 200)).unwrap();
        repos.posts().create(&post("p-1", "u-a", 1_000)).unwrap();

        repos
            .comments()
            .create(&CommentRecord {
                id: "c-1".into(),
                post_id: "p-1".into(),
                parent_id: None,
                user_id: "u-b".into(),
                content: "first".into(),
                created_at: 1_100,
            })
            .unwrap();
        repos
            .comments()
            .create(&CommentRecord {
                id: "c-2".into(),
                post_id: "p-1".into(),
                parent_id: Some("c-1".into()),
                user_id: "u-a".into(),
                content: "second".into(),
                created_at: 1_200,
            })
            .unwrap();
        repos.engagement().add_post_like("u-b", "p-1", 1_300).unwrap();

        let detail = repos
            .posts()
            .get_detail("p-1", Some("u-b"))
            .unwrap()
            .expect("post detail");
        assert_eq!(detail.author.username.as_deref(), Some("alice"));
        assert_eq!(detail.like_count, 1);
        assert_eq!(detail.comment_count, 2);
        assert!(detail.liked_by_viewer);
        assert!(!detail.reposted_by_viewer);

        let anonymous = repos.posts().get_detail("p-1", None).unwrap().unwrap();
        assert!(!anonymous.liked_by_viewer);

        let top_level = repos.comments().page_top_level("p-1", None, 14, None).unwrap();
        assert_eq!(top_level.len(), 1);
        assert_eq!(top_level[0].comment.id, "c-1");

        let children = repos.comments().children_of("c-1").unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0.post_id, "p-1");
        assert_eq!(children[0].1.id, "u-a");
    }

    #[test]
    fn keyset_pages_resume_at_the_cursor_row_across_timestamp_ties() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        repos.users().create(&user("u-a", Some("alice"), 100)).unwrap();
        // p-3 and p-2 share a timestamp so the id tie-break has to order them.
        for (id, at) in [("p-1", 10), ("p-2", 20), ("p-3", 20), ("p-4", 30), ("p-5", 40)] {
            repos.posts().create(&post(id, "u-a", at)).unwrap();
        }

        let first = repos.posts().page_recent(None, 2, None).unwrap();
        let ids: Vec<&str> = first.iter().map(|d| d.post.id.as_str()).collect();
        assert_eq!(ids, vec!["p-5", "p-4", "p-3"]);

        // The overflow row seeds the cursor and reappears first on the next page.
        let seed = Cursor {
            created_at: first[2].post.created_at,
            id: first[2].post.id.clone(),
        };
        let second = repos.posts().page_recent(None, 2, Some(&seed)).unwrap();
        let ids: Vec<&str> = second.iter().map(|d| d.post.id.as_str()).collect();
        assert_eq!(ids, vec!["p-3", "p-2", "p-1"]);
    }

    #[test]
    fn join_row_repositories_report_insert_and_delete_effects() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        repos.users().create(&user("u-a", Some("alice"), 100)).unwrap();
        repos.users().create(&user("u-b", Some("bob"), 200)).unwrap();
        repos.posts().create(&post("p-1", "u-a", 1_000)).unwrap();

        assert!(repos.engagement().add_post_like("u-b", "p-1", 1_100).unwrap());
        assert!(!repos.engagement().add_post_like("u-b", "p-1", 1_200).unwrap());
        assert!(repos.engagement().remove_post_like("u-b", "p-1").unwrap());
        assert!(!repos.engagement().remove_post_like("u-b", "p-1").unwrap());

        assert!(repos.follows().add("u-b", "u-a", 1_300).unwrap());
        assert!(!repos.follows().add("u-b", "u-a", 1_400).unwrap());
        let followers = repos.follows().followers_of("u-a").unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, "u-b");
        assert!(repos.follows().remove("u-b", "u-a").unwrap());
    }
}
