use crate::database::models::{
    MediaKind, NotificationKind, NotificationRecord, PostDetailRecord, PostRecord,
};
use crate::database::repositories::{
    EngagementRepository, NotificationRepository, PostRepository, UserRepository,
};
use crate::database::Database;
use crate::error::ServiceError;
use crate::mentions::extract_mentions;
use crate::pagination::{Cursor, Page};
use crate::users::UserView;
use crate::utils::{micros_to_rfc3339, now_micros};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const MAX_POST_CHARS: usize = 500;
pub(crate) const DEFAULT_FEED_LIMIT: usize = 5;
pub(crate) const DEFAULT_PROFILE_LIMIT: usize = 4;

const MAX_POSTS_PER_HOUR: i64 = 5;
const HOUR_MICROS: i64 = 3_600_000_000;

#[derive(Clone)]
pub struct FeedService {
    database: Database,
}

impl FeedService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Validates and stores a post, then fans out one mention notification
    /// per distinct `@username` that resolves to someone else.
    pub fn create_post(
        &self,
        author: &str,
        input: CreatePostInput,
    ) -> Result<PostView, ServiceError> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ServiceError::Validation(
                "post content may not be empty".into(),
            ));
        }
        if content.chars().count() > MAX_POST_CHARS {
            return Err(ServiceError::Validation(format!(
                "post content exceeds {MAX_POST_CHARS} characters"
            )));
        }
        let media_kind = match (input.media_url.as_deref(), input.media_kind.as_deref()) {
            (None, None) => None,
            (Some(_), Some(kind)) => Some(
                MediaKind::parse(kind)
                    .ok_or_else(|| ServiceError::Validation(format!("unknown media kind {kind}")))?,
            ),
            _ => {
                return Err(ServiceError::Validation(
                    "media url and media kind must be provided together".into(),
                ))
            }
        };

        let now = now_micros();
        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            user_id: author.to_string(),
            content,
            media_url: input.media_url,
            media_kind: media_kind.map(|kind| kind.as_str().to_string()),
            created_at: now,
        };
        let mentions = extract_mentions(&record.content);

        self.database.with_repositories(|repos| {
            let recent = repos.posts().count_since(author, now - HOUR_MICROS)?;
            if recent >= MAX_POSTS_PER_HOUR {
                return Err(ServiceError::RateLimited(format!(
                    "post rate limit of {MAX_POSTS_PER_HOUR} per hour reached"
                )));
            }
            let tx = repos.conn().unchecked_transaction()?;
            repos.posts().create(&record)?;
            for handle in &mentions {
                let Some(target) = repos.users().get_by_username(handle)? else {
                    continue;
                };
                if target.id == author {
                    continue;
                }
                repos.notifications().record(&NotificationRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: target.id,
                    sender_id: author.to_string(),
                    kind: NotificationKind::Mention.as_str().to_string(),
                    post_id: Some(record.id.clone()),
                    created_at: now,
                })?;
            }
            tx.commit()?;

            let detail = repos
                .posts()
                .get_detail(&record.id, Some(author))?
                .ok_or_else(|| {
                    ServiceError::Internal(anyhow!("post creation lost newly inserted row"))
                })?;
            Ok(PostView::from_record(detail))
        })
    }

    pub fn get_post(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> Result<Option<PostView>, ServiceError> {
        self.database.with_repositories(|repos| {
            Ok(repos
                .posts()
                .get_detail(id, viewer)?
                .map(PostView::from_record))
        })
    }

    pub fn list_posts(
        &self,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<PostView>, ServiceError> {
        self.database.with_repositories(|repos| {
            let rows = repos.posts().page_recent(viewer, limit, cursor)?;
            Ok(fold_page(rows, limit))
        })
    }

    /// Profile feed. A missing author id short-circuits to an empty page
    /// without touching the database.
    pub fn posts_by_user(
        &self,
        author: Option<&str>,
        viewer: Option<&str>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<PostView>, ServiceError> {
        let Some(author) = author else {
            return Ok(Page::empty());
        };
        self.database.with_repositories(|repos| {
            let rows = repos.posts().page_by_author(author, viewer, limit, cursor)?;
            Ok(fold_page(rows, limit))
        })
    }

    pub fn toggle_like(&self, actor: &str, post_id: &str) -> Result<LikeState, ServiceError> {
        self.database.with_repositories(|repos| {
            let Some(post) = repos.posts().get(post_id)? else {
                return Err(ServiceError::NotFound(format!("post {post_id} not found")));
            };
            let tx = repos.conn().unchecked_transaction()?;
            let now = now_micros();
            let liked = if repos.engagement().add_post_like(actor, post_id, now)? {
                if post.user_id != actor {
                    repos.notifications().record(&NotificationRecord {
                        id: Uuid::new_v4().to_string(),
                        user_id: post.user_id.clone(),
                        sender_id: actor.to_string(),
                        kind: NotificationKind::Like.as_str().to_string(),
                        post_id: Some(post_id.to_string()),
                        created_at: now,
                    })?;
                }
                true
            } else {
                repos.engagement().remove_post_like(actor, post_id)?;
                false
            };
            tx.commit()?;
            Ok(LikeState { liked })
        })
    }

    pub fn toggle_repost(&self, actor: &str, post_id: &str) -> Result<RepostState, ServiceError> {
        self.database.with_repositories(|repos| {
            let Some(post) = repos.posts().get(post_id)? else {
                return Err(ServiceError::NotFound(format!("post {post_id} not found")));
            };
            let tx = repos.conn().unchecked_transaction()?;
            let now = now_micros();
            let reposted = if repos.engagement().add_repost(actor, post_id, now)? {
                if post.user_id != actor {
                    repos.notifications().record(&NotificationRecord {
                        id: Uuid::new_v4().to_string(),
                        user_id: post.user_id.clone(),
                        sender_id: actor.to_string(),
                        kind: NotificationKind::Repost.as_str().to_string(),
                        post_id: Some(post_id.to_string()),
                        created_at: now,
                    })?;
                }
                true
            } else {
                repos.engagement().remove_repost(actor, post_id)?;
                false
            };
            tx.commit()?;
            Ok(RepostState { reposted })
        })
    }

    pub fn post_likers(&self, post_id: &str) -> Result<Vec<UserView>, ServiceError> {
        self.database.with_repositories(|repos| {
            if repos.posts().get(post_id)?.is_none() {
                return Err(ServiceError::NotFound(format!("post {post_id} not found")));
            }
            Ok(repos
                .engagement()
                .post_likers(post_id)?
                .into_iter()
                .map(UserView::from_record)
                .collect())
        })
    }
}

fn fold_page(rows: Vec<PostDetailRecord>, limit: usize) -> Page<PostView> {
    Page::from_overfetch(rows, limit, |detail| Cursor {
        created_at: detail.post.created_at,
        id: detail.post.id.clone(),
    })
    .map(PostView::from_record)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub user: UserView,
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<String>,
    pub created_at: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub repost_count: i64,
    pub liked_by_viewer: bool,
    pub reposted_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepostState {
    pub reposted: bool,
}

impl PostView {
    pub(crate) fn from_record(record: PostDetailRecord) -> Self {
        Self {
            id: record.post.id,
            user: UserView::from_record(record.author),
            content: record.post.content,
            media_url: record.post.media_url,
            media_kind: record.post.media_kind,
            created_at: micros_to_rfc3339(record.post.created_at),
            like_count: record.like_count,
            comment_count: record.comment_count,
            repost_count: record.repost_count,
            liked_by_viewer: record.liked_by_viewer,
            reposted_by_viewer: record.reposted_by_viewer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRecord;
    use crate::database::repositories::NotificationRepository;
    use rusqlite::Connection;

    fn setup_service() -> (FeedService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (FeedService::new(db.clone()), db)
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

    fn notifications_for(db: &Database, user_id: &str) -> Vec<(String, Option<String>)> {
        db.with_repositories(|repos| {
            Ok(repos
                .notifications()
                .page_for_user(user_id, 50, None)?
                .into_iter()
                .map(|(n, _)| (n.kind, n.post_id))
                .collect())
        })
        .expect("notifications")
    }

    fn text_post(content: &str) -> CreatePostInput {
        CreatePostInput {
            content: content.into(),
            media_url: None,
            media_kind: None,
        }
    }

    #[test]
    fn post_creation_validates_content_and_media() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");

        let err = service.create_post("u-a", text_post("   ")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let long = "x".repeat(MAX_POST_CHARS + 1);
        let err = service.create_post("u-a", text_post(&long)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .create_post(
                "u-a",
                CreatePostInput {
                    content: "kind without url".into(),
                    media_url: None,
                    media_kind: Some("image".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .create_post(
                "u-a",
                CreatePostInput {
                    content: "bad kind".into(),
                    media_url: Some("https://example.com/clip".into()),
                    media_kind: Some("gif".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let post = service
            .create_post(
                "u-a",
                CreatePostInput {
                    content: "  trimmed  ".into(),
                    media_url: Some("https://example.com/pic".into()),
                    media_kind: Some("image".into()),
                },
            )
            .unwrap();
        assert_eq!(post.content, "trimmed");
        assert_eq!(post.media_kind.as_deref(), Some("image"));
    }

    #[test]
    fn like_toggle_round_trips_and_notifies_the_author_once() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");

        let post = service.create_post("u-a", text_post("hello")).unwrap();
        let fresh = service
            .get_post(&post.id, Some("u-b"))
            .unwrap()
            .expect("post");
        assert!(!fresh.liked_by_viewer);
        assert_eq!(fresh.comment_count, 0);

        let state = service.toggle_like("u-b", &post.id).unwrap();
        assert!(state.liked);
        let kinds = notifications_for(&db, "u-a");
        assert_eq!(kinds, vec![("like".to_string(), Some(post.id.clone()))]);

        let state = service.toggle_like("u-b", &post.id).unwrap();
        assert!(!state.liked);
        assert_eq!(notifications_for(&db, "u-a").len(), 1);

        let fresh = service.get_post(&post.id, Some("u-b")).unwrap().unwrap();
        assert!(!fresh.liked_by_viewer);
        assert_eq!(fresh.like_count, 0);
    }

    #[test]
    fn self_like_never_notifies() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");

        let post = service.create_post("u-a", text_post("note to self")).unwrap();
        let state = service.toggle_like("u-a", &post.id).unwrap();
        assert!(state.liked);
        assert!(notifications_for(&db, "u-a").is_empty());
    }

    #[test]
    fn repost_toggle_notifies_the_author() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");

        let post = service.create_post("u-a", text_post("boost me")).unwrap();
        let state = service.toggle_repost("u-b", &post.id).unwrap();
        assert!(state.reposted);
        assert_eq!(notifications_for(&db, "u-a")[0].0, "repost");

        let state = service.toggle_repost("u-b", &post.id).unwrap();
        assert!(!state.reposted);
        assert_eq!(notifications_for(&db, "u-a").len(), 1);
    }

    #[test]
    fn toggles_against_missing_posts_are_not_found() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        let err = service.toggle_like("u-a", "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = service.toggle_repost("u-a", "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = service.post_likers("missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn mentions_notify_each_resolved_user_once() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_user(&db, "u-b", "bob");
        seed_user(&db, "u-c", "carol");

        let post = service
            .create_post("u-a", text_post("hey @bob and @carol, right @bob? cc @ghost @alice"))
            .unwrap();

        let bob = notifications_for(&db, "u-b");
        assert_eq!(bob, vec![("mention".to_string(), Some(post.id.clone()))]);
        assert_eq!(notifications_for(&db, "u-c").len(), 1);
        // The author mentioning themselves stays silent.
        assert!(notifications_for(&db, "u-a").is_empty());
    }

    #[test]
    fn sixth_post_within_an_hour_is_rate_limited() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");

        for n in 0..5 {
            service
                .create_post("u-a", text_post(&format!("post {n}")))
                .unwrap();
        }
        let err = service.create_post("u-a", text_post("one too many")).unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited(_)));
    }

    #[test]
    fn feed_pages_yield_every_post_exactly_once() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        // Two posts share a timestamp to exercise the id tie-break.
        for (id, at) in [("p-1", 10), ("p-2", 20), ("p-3", 20), ("p-4", 30), ("p-5", 40)] {
            seed_post(&db, id, "u-a", at);
        }

        let first = service.list_posts(None, 2, None).unwrap();
        let ids: Vec<&str> = first.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-5", "p-4"]);
        let cursor = first.next_cursor.expect("first cursor");

        let second = service.list_posts(None, 2, Some(&cursor)).unwrap();
        let ids: Vec<&str> = second.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-3", "p-2"]);
        let cursor = second.next_cursor.expect("second cursor");

        let third = service.list_posts(None, 2, Some(&cursor)).unwrap();
        let ids: Vec<&str> = third.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1"]);
        assert!(third.next_cursor.is_none());
    }

    #[test]
    fn profile_feed_short_circuits_without_an_author() {
        let (service, db) = setup_service();
        seed_user(&db, "u-a", "alice");
        seed_post(&db, "p-1", "u-a", 10);

        let page = service.posts_by_user(None, None, 4, None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());

        let page = service.posts_by_user(Some("u-a"), None, 4, None).unwrap();
        assert_eq!(page.items.len(), 1);

        let page = service.posts_by_user(Some("nobody"), None, 4, None).unwrap();
        assert!(page.items.is_empty());
    }
}
