use crate::database::models::{
    CommentDetailRecord, CommentRecord, NotificationKind, NotificationRecord, UserRecord,
};
use crate::database::repositories::{
    CommentRepository, EngagementRepository, NotificationRepository, PostRepository,
    SqliteRepositories,
};
use crate::database::Database;
use crate::error::ServiceError;
use crate::feed::{LikeState, PostView, RepostState};
use crate::pagination::{Cursor, Page};
use crate::users::UserView;
use crate::utils::{micros_to_rfc3339, now_micros};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const MAX_COMMENT_CHARS: usize = 500;
pub(crate) const DEFAULT_COMMENT_LIMIT: usize = 14;

#[derive(Clone)]
pub struct CommentService {
    database: Database,
}

impl CommentService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Top-level reply on a post. Notifies the post author unless they
    /// wrote the comment themselves.
    pub fn add_parent_comment(
        &self,
        actor: &str,
        post_id: &str,
        content: &str,
    ) -> Result<CommentView, ServiceError> {
        let content = validate_content(content)?;
        self.database.with_repositories(|repos| {
            let Some(post) = repos.posts().get(post_id)? else {
                return Err(ServiceError::NotFound(format!("post {post_id} not found")));
            };
            let now = now_micros();
            let record = CommentRecord {
                id: Uuid::new_v4().to_string(),
                post_id: post.id.clone(),
                parent_id: None,
                user_id: actor.to_string(),
                content,
                created_at: now,
            };
            let tx = repos.conn().unchecked_transaction()?;
            repos.comments().create(&record)?;
            if post.user_id != actor {
                repos.notifications().record(&NotificationRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: post.user_id.clone(),
                    sender_id: actor.to_string(),
                    kind: NotificationKind::Reply.as_str().to_string(),
                    post_id: Some(post.id.clone()),
                    created_at: now,
                })?;
            }
            tx.commit()?;
            self.read_created(&repos, &record.id, actor)
        })
    }

    /// Reply to an existing comment. The post is inherited from the
    /// parent, which keeps every child on its parent's post. Notifies the
    /// parent's author, not the post's.
    pub fn add_child_comment(
        &self,
        actor: &str,
        parent_id: &str,
        content: &str,
    ) -> Result<CommentView, ServiceError> {
        let content = validate_content(content)?;
        self.database.with_repositories(|repos| {
            let Some(parent) = repos.comments().get(parent_id)? else {
                return Err(ServiceError::NotFound(format!(
                    "comment {parent_id} not found"
                )));
            };
            let now = now_micros();
            let record = CommentRecord {
                id: Uuid::new_v4().to_string(),
                post_id: parent.post_id.clone(),
                parent_id: Some(parent.id.clone()),
                user_id: actor.to_string(),
                content,
                created_at: now,
            };
            let tx = repos.conn().unchecked_transaction()?;
            repos.comments().create(&record)?;
            if parent.user_id != actor {
                repos.notifications().record(&NotificationRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: parent.user_id.clone(),
                    sender_id: actor.to_string(),
                    kind: NotificationKind::ReplyChild.as_str().to_string(),
                    post_id: Some(parent.post_id.clone()),
                    created_at: now,
                })?;
            }
            tx.commit()?;
            self.read_created(&repos, &record.id, actor)
        })
    }

    /// Top-level comments of a post, newest first, each carrying its
    /// direct replies. A missing post id short-circuits to an empty page.
    pub fn list_for_post(
        &self,
        post_id: Option<&str>,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<CommentView>, ServiceError> {
        let Some(post_id) = post_id else {
            return Ok(Page::empty());
        };
        self.database.with_repositories(|repos| {
            let rows = repos.comments().page_top_level(post_id, viewer, limit, cursor)?;
            let page = fold_page(rows, limit);
            let mut items = Vec::with_capacity(page.items.len());
            for detail in page.items {
                let children = self.children_of(&repos, &detail.comment.id)?;
                items.push(CommentView::from_record(detail, children));
            }
            Ok(Page {
                items,
                next_cursor: page.next_cursor,
            })
        })
    }

    /// Every comment a user wrote, top-level and replies alike, each
    /// paired with the post it belongs to.
    pub fn list_for_user(
        &self,
        user_id: Option<&str>,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<UserCommentView>, ServiceError> {
        let Some(user_id) = user_id else {
            return Ok(Page::empty());
        };
        self.database.with_repositories(|repos| {
            let rows = repos.comments().page_by_user(user_id, viewer, limit, cursor)?;
            let page = fold_page(rows, limit);
            let mut items = Vec::with_capacity(page.items.len());
            for detail in page.items {
                let post = repos
                    .posts()
                    .get_detail(&detail.comment.post_id, viewer)?
                    .ok_or_else(|| {
                        ServiceError::Internal(anyhow!("comment references a missing post"))
                    })?;
                let children = self.children_of(&repos, &detail.comment.id)?;
                items.push(UserCommentView {
                    comment: CommentView::from_record(detail, children),
                    post: PostView::from_record(post),
                });
            }
            Ok(Page {
                items,
                next_cursor: page.next_cursor,
            })
        })
    }

    pub fn toggle_like(&self, actor: &str, comment_id: &str) -> Result<LikeState, ServiceError> {
        self.database.with_repositories(|repos| {
            if repos.comments().get(comment_id)?.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "comment {comment_id} not found"
                )));
            }
            // Comment engagement never notifies anyone.
            let liked = if repos
                .engagement()
                .add_comment_like(actor, comment_id, now_micros())?
            {
                true
            } else {
                repos.engagement().remove_comment_like(actor, comment_id)?;
                false
            };
            Ok(LikeState { liked })
        })
    }

    pub fn toggle_repost(
        &self,
        actor: &str,
        comment_id: &str,
    ) -> Result<RepostState, ServiceError> {
        self.database.with_repositories(|repos| {
            if repos.comments().get(comment_id)?.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "comment {comment_id} not found"
                )));
            }
            let reposted = if repos
                .engagement()
                .add_comment_repost(actor, comment_id, now_micros())?
            {
                true
            } else {
                repos.engagement().remove_comment_repost(actor, comment_id)?;
                false
            };
            Ok(RepostState { reposted })
        })
    }

    fn children_of(
        &self,
        repos: &SqliteRepositories<'_>,
        parent_id: &str,
    ) -> Result<Vec<ChildCommentView>, ServiceError> {
        Ok(repos
            .comments()
            .children_of(parent_id)?
            .into_iter()
            .map(|(comment, author)| ChildCommentView::from_record(comment, author))
            .collect())
    }

    fn read_created(
        &self,
        repos: &SqliteRepositories<'_>,
        comment_id: &str,
        actor: &str,
    ) -> Result<CommentView, ServiceError> {
        let detail = repos
            .comments()
            .get_detail(comment_id, Some(actor))?
            .ok_or_else(|| {
                ServiceError::Internal(anyhow!("comment creation lost newly inserted row"))
            })?;
        Ok(CommentView::from_record(detail, Vec::new()))
    }
}

fn validate_content(content: &str) -> Result<String, ServiceError> {
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(ServiceError::Validation(
            "comment content may not be empty".into(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(ServiceError::Validation(format!(
            "comment content exceeds {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(content)
}

fn fold_page(rows: Vec<CommentDetailRecord>, limit: usize) -> Page<CommentDetailRecord> {
    Page::from_overfetch(rows, limit, |detail| Cursor {
        created_at: detail.comment.created_at,
        id: detail.comment.id.clone(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub user: UserView,
    pub content: String,
    pub created_at: String,
    pub like_count: i64,
    pub repost_count: i64,
    pub liked_by_viewer: bool,
    pub reposted_by_viewer: bool,
    pub child_comments: Vec<ChildCommentView>,
}

/// Direct replies are rendered with author context only; their own
/// engagement is fetched lazily when the client drills in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildCommentView {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub user: UserView,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCommentView {
    pub comment: CommentView,
    pub post: PostView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
}

impl CommentView {
    fn from_record(record: CommentDetailRecord, child_comments: Vec<ChildCommentView>) -> Self {
        Self {
            id: record.comment.id,
            post_id: record.comment.post_id,
            parent_id: record.comment.parent_id,
            user: UserView::from_record(record.author),
            content: record.comment.content,
            created_at: micros_to_rfc3339(record.comment.created_at),
            like_count: record.like_count,
            repost_count: record.repost_count,
            liked_by_viewer: record.liked_by_viewer,
            reposted_by_viewer: record.reposted_by_viewer,
            child_comments,
        }
    }
}

impl ChildCommentView {
    fn from_record(comment: CommentRecord, author: UserRecord) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            user: UserView::from_record(author),
            content: comment.content,
            created_at: micros_to_rfc3339(comment.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{PostRecord, UserRecord};
    use crate::database::repositories::{PostRepository, UserRepository};
    use rusqlite::Connection;

    fn setup_service() -> (CommentService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (CommentService::new(db.clone()), db)
    }

    fn seed_user(db: &Database, id: &str, username: &str) {
        db.with_repositories(|repos| {
            repos.users().create(&UserRecord {
                id: id.into(),
                username: Some(username.into()),
                display_name: username.into(),
                avatar_url: None,
                bio: None,
                verified: false,
                created_at: 1,
            })?;
            Ok(())
        })
        .expect("seed user");
    }

    fn seed_post(db: &Database, id: &str, user_id: &str, created_at: i64) {
        db.with_repositories(|repos| {
            repos.posts().create(&PostRecord {
                id: id.into(),
                user_id: user_id.into(),
                content: format!("post {id}"),
                media_url: None,
                media_kind: None,
                created_at,
            })?;
            Ok(())
        })
        .expect("seed post");
    }

    fn notification_kinds(db: &Database, user_id: &str) -> Vec<String> {
        db.with_repositories(|repos| {
            Ok(repos
                .notifications()
                .page_for_user(user_id, 50, None)?
                .into_iter()
                .map(|(n, _)| n.kind)
                .collect())
        })
        .expect("notifications")
    }

    #[test]
    fn reply_tree_notifies_the_right_authors() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");
        seed_user(&db, "u-c", "carol");
        seed_post(&db, "p-1", "u-a", 10);

        let parent = service.add_parent_comment("u-b", "p-1", "first!").unwrap();
        assert_eq!(notification_kinds(&db, "u-a"), vec!["reply"]);

        let child = service
            .add_child_comment("u-c", &parent.id, "agreed")
            .unwrap();
        assert_eq!(child.post_id, "p-1");
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        // The parent's author hears about the child reply, the post's does not.
        assert_eq!(notification_kinds(&db, "u-b"), vec!["reply_child"]);
        assert_eq!(notification_kinds(&db, "u-a"), vec!["reply"]);

        let page = service.list_for_post(Some("p-1"), None, 14, None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, parent.id);
        assert_eq!(page.items[0].child_comments.len(), 1);
        assert_eq!(page.items[0].child_comments[0].user.id, "u-c");
    }

    #[test]
    fn commenting_on_your_own_post_stays_silent() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_post(&db, "p-1", "u-a", 10);

        service.add_parent_comment("u-a", "p-1", "me again").unwrap();
        assert!(notification_kinds(&db, "u-a").is_empty());
    }

    #[test]
    fn replies_to_missing_targets_are_not_found() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");

        let err = service
            .add_parent_comment("u-a", "missing", "hello?")
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service
            .add_child_comment("u-a", "missing", "hello?")
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn comment_content_is_validated() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_post(&db, "p-1", "u-a", 10);

        let err = service.add_parent_comment("u-a", "p-1", "  ").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let long = "x".repeat(MAX_COMMENT_CHARS + 1);
        let err = service.add_parent_comment("u-a", "p-1", &long).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn comment_engagement_toggles_without_notifications() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");
        seed_post(&db, "p-1", "u-a", 10);

        let comment = service.add_parent_comment("u-a", "p-1", "like me").unwrap();

        let state = service.toggle_like("u-b", &comment.id).unwrap();
        assert!(state.liked);
        let state = service.toggle_like("u-b", &comment.id).unwrap();
        assert!(!state.liked);

        let state = service.toggle_repost("u-b", &comment.id).unwrap();
        assert!(state.reposted);

        assert!(notification_kinds(&db, "u-a").is_empty());

        let err = service.toggle_like("u-b", "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn post_comment_pages_cover_top_level_comments_exactly_once() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_post(&db, "p-1", "u-a", 10);

        db.with_repositories(|repos| {
            for n in 1..=5 {
                repos.comments().create(&CommentRecord {
                    id: format!("c-{n}"),
                    post_id: "p-1".into(),
                    parent_id: None,
                    user_id: "u-a".into(),
                    content: format!("comment {n}"),
                    created_at: 100 + n,
                })?;
            }
            // A child reply must not surface as its own top-level row.
            repos.comments().create(&CommentRecord {
                id: "c-child".into(),
                post_id: "p-1".into(),
                parent_id: Some("c-5".into()),
                user_id: "u-a".into(),
                content: "nested".into(),
                created_at: 200,
            })?;
            Ok(())
        })
        .unwrap();

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = service
                .list_for_post(Some("p-1"), None, 2, cursor.as_ref())
                .unwrap();
            seen.extend(page.items.iter().map(|c| c.id.clone()));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["c-5", "c-4", "c-3", "c-2", "c-1"]);
    }

    #[test]
    fn user_comment_listing_attaches_the_post() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");
        seed_post(&db, "p-1", "u-a", 10);

        let parent = service.add_parent_comment("u-a", "p-1", "root").unwrap();
        service.add_child_comment("u-b", &parent.id, "leaf").unwrap();

        let page = service.list_for_user(Some("u-b"), None, 14, None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].comment.content, "leaf");
        assert_eq!(page.items[0].post.id, "p-1");

        let empty = service.list_for_user(None, None, 14, None).unwrap();
        assert!(empty.items.is_empty());
    }
}
