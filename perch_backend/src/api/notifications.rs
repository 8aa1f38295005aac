use super::auth::Actor;
use super::{ApiResult, AppState, PageParams};
use crate::notifications::{NotificationService, NotificationView, DEFAULT_NOTIFICATION_LIMIT};
use crate::pagination::Page;
use axum::extract::{Query, State};
use axum::Json;

pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<NotificationView>> {
    let service = NotificationService::new(state.database.clone());
    let cursor = params.cursor()?;
    let page = service.list_for_user(
        &actor.user_id,
        params.limit(DEFAULT_NOTIFICATION_LIMIT),
        cursor.as_ref(),
    )?;
    Ok(Json(page))
}
