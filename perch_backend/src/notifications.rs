use crate::database::models::{NotificationRecord, UserRecord};
use crate::database::repositories::NotificationRepository;
use crate::database::Database;
use crate::error::ServiceError;
use crate::pagination::{Cursor, Page};
use crate::users::UserView;
use crate::utils::micros_to_rfc3339;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_NOTIFICATION_LIMIT: usize = 14;

#[derive(Clone)]
pub struct NotificationService {
    database: Database,
}

impl NotificationService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// A user's notification log, newest first. Rows are written by the
    /// feed, comment, and follow mutations and never change afterwards.
    pub fn list_for_user(
        &self,
        user_id: &str,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<NotificationView>, ServiceError> {
        self.database.with_repositories(|repos| {
            let rows = repos.notifications().page_for_user(user_id, limit, cursor)?;
            Ok(Page::from_overfetch(rows, limit, |(notification, _)| Cursor {
                created_at: notification.created_at,
                id: notification.id.clone(),
            })
            .map(|(notification, sender)| NotificationView::from_record(notification, sender)))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: String,
    pub kind: String,
    pub post_id: Option<String>,
    pub sender: UserView,
    pub created_at: String,
}

impl NotificationView {
    fn from_record(record: NotificationRecord, sender: UserRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            post_id: record.post_id,
            sender: UserView::from_record(sender),
            created_at: micros_to_rfc3339(record.created_at),
        }
    }
}
