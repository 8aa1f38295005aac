use crate::database::models::{
    NotificationKind, NotificationRecord, SessionRecord, UserProfileRecord, UserRecord,
};
use crate::database::repositories::{
    FollowRepository, NotificationRepository, SessionRepository, UserRepository,
};
use crate::database::Database;
use crate::error::ServiceError;
use crate::utils::{micros_to_rfc3339, new_session_token, now_micros, token_hash};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

pub(crate) static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("username regex"));

const DEFAULT_SEARCH_LIMIT: usize = 20;
const RECOMMENDED_LIMIT: usize = 5;

#[derive(Clone)]
pub struct UserService {
    database: Database,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates an account together with its first bearer session. The
    /// username is optional at registration and can be claimed later.
    pub fn register(&self, input: RegisterInput) -> Result<RegisteredUser, ServiceError> {
        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(ServiceError::Validation(
                "display name may not be empty".into(),
            ));
        }
        if let Some(username) = input.username.as_deref() {
            if !USERNAME_RE.is_match(username) {
                return Err(ServiceError::Validation(
                    "username must be 3-30 letters, digits, or underscores".into(),
                ));
            }
        }

        let user_record = UserRecord {
            id: Uuid::new_v4().to_string(),
            username: input.username,
            display_name,
            avatar_url: input.avatar_url,
            bio: input.bio,
            verified: false,
            created_at: now_micros(),
        };
        let token = new_session_token();
        let session_record = SessionRecord {
            token_hash: token_hash(&token),
            user_id: user_record.id.clone(),
            created_at: user_record.created_at,
        };

        self.database.with_repositories(|repos| {
            if let Some(username) = user_record.username.as_deref() {
                if repos.users().username_taken(username)? {
                    return Err(ServiceError::Conflict(format!(
                        "username {username} is taken"
                    )));
                }
            }
            let tx = repos.conn().unchecked_transaction()?;
            repos.users().create(&user_record)?;
            repos.sessions().create(&session_record)?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(RegisteredUser {
            user: UserView::from_record(user_record),
            token,
        })
    }

    pub fn get_profile(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> Result<Option<UserProfileView>, ServiceError> {
        self.database.with_repositories(|repos| {
            Ok(repos
                .users()
                .profile(id, viewer)?
                .map(UserProfileView::from_record))
        })
    }

    pub fn get_profile_by_username(
        &self,
        username: &str,
        viewer: Option<&str>,
    ) -> Result<Option<UserProfileView>, ServiceError> {
        self.database.with_repositories(|repos| {
            Ok(repos
                .users()
                .profile_by_username(username, viewer)?
                .map(UserProfileView::from_record))
        })
    }

    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<UserView>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 100);
        self.database.with_repositories(|repos| {
            Ok(repos
                .users()
                .search(query, limit)?
                .into_iter()
                .map(UserView::from_record)
                .collect())
        })
    }

    pub fn recommended(&self, viewer: Option<&str>) -> Result<Vec<UserView>, ServiceError> {
        self.database.with_repositories(|repos| {
            Ok(repos
                .users()
                .recommended(viewer, RECOMMENDED_LIMIT)?
                .into_iter()
                .map(UserView::from_record)
                .collect())
        })
    }

    pub fn followers_of(&self, user_id: &str) -> Result<Vec<UserView>, ServiceError> {
        self.database.with_repositories(|repos| {
            if repos.users().get(user_id)?.is_none() {
                return Err(ServiceError::NotFound(format!("user {user_id} not found")));
            }
            Ok(repos
                .follows()
                .followers_of(user_id)?
                .into_iter()
                .map(UserView::from_record)
                .collect())
        })
    }

    pub fn following_of(&self, user_id: &str) -> Result<Vec<UserView>, ServiceError> {
        self.database.with_repositories(|repos| {
            if repos.users().get(user_id)?.is_none() {
                return Err(ServiceError::NotFound(format!("user {user_id} not found")));
            }
            Ok(repos
                .follows()
                .following_of(user_id)?
                .into_iter()
                .map(UserView::from_record)
                .collect())
        })
    }

    /// Follows the target when no edge exists, unfollows otherwise. Each
    /// fresh follow notifies the followee.
    pub fn toggle_follow(&self, actor: &str, target: &str) -> Result<FollowState, ServiceError> {
        if actor == target {
            return Err(ServiceError::Validation("cannot follow yourself".into()));
        }
        self.database.with_repositories(|repos| {
            if repos.users().get(target)?.is_none() {
                return Err(ServiceError::NotFound(format!("user {target} not found")));
            }
            let tx = repos.conn().unchecked_transaction()?;
            let now = now_micros();
            let following = if repos.follows().add(actor, target, now)? {
                repos.notifications().record(&NotificationRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: target.to_string(),
                    sender_id: actor.to_string(),
                    kind: NotificationKind::Follow.as_str().to_string(),
                    post_id: None,
                    created_at: now,
                })?;
                true
            } else {
                repos.follows().remove(actor, target)?;
                false
            };
            tx.commit()?;
            Ok(FollowState { following })
        })
    }

    pub fn change_username(
        &self,
        actor: &str,
        username: &str,
    ) -> Result<UserView, ServiceError> {
        if !USERNAME_RE.is_match(username) {
            return Err(ServiceError::Validation(
                "username must be 3-30 letters, digits, or underscores".into(),
            ));
        }
        self.database.with_repositories(|repos| {
            if let Some(existing) = repos.users().get_by_username(username)? {
                if existing.id != actor {
                    return Err(ServiceError::Conflict(format!(
                        "username {username} is taken"
                    )));
                }
            }
            repos.users().set_username(actor, username)?;
            let user = repos
                .users()
                .get(actor)?
                .ok_or_else(|| ServiceError::NotFound(format!("user {actor} not found")))?;
            Ok(UserView::from_record(user))
        })
    }

    pub fn username_taken(&self, username: &str) -> Result<bool, ServiceError> {
        self.database
            .with_repositories(|repos| Ok(repos.users().username_taken(username)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub username: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileView {
    pub user: UserView,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub followed_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub display_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowState {
    pub following: bool,
}

impl UserView {
    pub(crate) fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            display_name: record.display_name,
            avatar_url: record.avatar_url,
            bio: record.bio,
            verified: record.verified,
            created_at: micros_to_rfc3339(record.created_at),
        }
    }
}

impl UserProfileView {
    fn from_record(record: UserProfileRecord) -> Self {
        Self {
            user: UserView::from_record(record.user),
            follower_count: record.follower_count,
            following_count: record.following_count,
            post_count: record.post_count,
            followed_by_viewer: record.followed_by_viewer,
        }
    }
}
