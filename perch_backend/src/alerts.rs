use crate::database::models::AlertRecord;
use crate::database::repositories::AlertRepository;
use crate::database::Database;
use crate::error::ServiceError;
use crate::utils::micros_to_rfc3339;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct AlertService {
    database: Database,
}

impl AlertService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The newest visible site alert, if an operator has published one.
    /// Alert rows are maintained out of band, directly in the database.
    pub fn current(&self) -> Result<Option<AlertView>, ServiceError> {
        self.database.with_repositories(|repos| {
            Ok(repos.alerts().latest_visible()?.map(AlertView::from_record))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertView {
    pub id: String,
    pub content: String,
    pub created_at: String,
}

impl AlertView {
    fn from_record(record: AlertRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            created_at: micros_to_rfc3339(record.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> (AlertService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (AlertService::new(db.clone()), db)
    }

    fn seed_alert(db: &Database, id: &str, visible: bool, created_at: i64) {
        db.with_repositories(|repos| {
            repos.alerts().create(&AlertRecord {
                id: id.into(),
                content: format!("alert {id}"),
                visible,
                created_at,
            })?;
            Ok(())
        })
        .expect("seed alert");
    }

    #[test]
    fn no_alert_without_visible_rows() {
        let (service, db) = setup_service();
        assert!(service.current().unwrap().is_none());

        seed_alert(&db, "a-1", false, 10);
        assert!(service.current().unwrap().is_none());
    }

    #[test]
    fn newest_visible_alert_wins() {
        let (service, db) = setup_service();
        seed_alert(&db, "a-1", true, 10);
        seed_alert(&db, "a-2", true, 20);
        seed_alert(&db, "a-3", false, 30);

        let alert = service.current().unwrap().expect("alert");
        assert_eq!(alert.id, "a-2");
        assert_eq!(alert.content, "alert a-2");
    }
}
