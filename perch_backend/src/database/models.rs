use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<String>, // 'image' or 'video'
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub user_id: String,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub sender_id: String,
    pub kind: String,
    pub post_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub content: String,
    pub visible: bool,
    pub created_at: i64,
}

/// Attachment kind accepted on posts. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Why a notification row exists. Stored as lowercase text in `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Follow,
    Like,
    Reply,
    ReplyChild,
    Mention,
    Repost,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Reply => "reply",
            NotificationKind::ReplyChild => "reply_child",
            NotificationKind::Mention => "mention",
            NotificationKind::Repost => "repost",
        }
    }
}

/// Post joined with its author and viewer-dependent engagement state.
#[derive(Debug, Clone)]
pub struct PostDetailRecord {
    pub post: PostRecord,
    pub author: UserRecord,
    pub like_count: i64,
    pub comment_count: i64,
    pub repost_count: i64,
    pub liked_by_viewer: bool,
    pub reposted_by_viewer: bool,
}

#[derive(Debug, Clone)]
pub struct CommentDetailRecord {
    pub comment: CommentRecord,
    pub author: UserRecord,
    pub like_count: i64,
    pub repost_count: i64,
    pub liked_by_viewer: bool,
    pub reposted_by_viewer: bool,
}

#[derive(Debug, Clone)]
pub struct UserProfileRecord {
    pub user: UserRecord,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub followed_by_viewer: bool,
}
