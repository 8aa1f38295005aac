use super::{ApiResult, AppState};
use crate::alerts::{AlertService, AlertView};
use axum::extract::State;
use axum::Json;

/// `null` body when no alert is currently visible.
pub(crate) async fn get_alert(State(state): State<AppState>) -> ApiResult<Option<AlertView>> {
    let service = AlertService::new(state.database.clone());
    let alert = service.current()?;
    Ok(Json(alert))
}
