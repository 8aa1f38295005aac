use super::auth::{Actor, MaybeActor};
use super::{ApiError, ApiResult, AppState, PageParams};
use crate::feed::{
    CreatePostInput, FeedService, LikeState, PostView, RepostState, DEFAULT_FEED_LIMIT,
    DEFAULT_PROFILE_LIMIT,
};
use crate::pagination::Page;
use crate::users::UserView;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: String,
    version: String,
    api_port: u16,
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_port: state.config.api_port,
    })
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<PostView>> {
    let service = FeedService::new(state.database.clone());
    let cursor = params.cursor()?;
    let page = service.list_posts(
        viewer.0.as_deref(),
        params.limit(DEFAULT_FEED_LIMIT),
        cursor.as_ref(),
    )?;
    Ok(Json(page))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreatePostInput>,
) -> ApiResult<PostView> {
    let service = FeedService::new(state.database.clone());
    let post = service.create_post(&actor.user_id, input)?;
    Ok(Json(post))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(id): Path<String>,
) -> ApiResult<PostView> {
    let service = FeedService::new(state.database.clone());
    let post = service
        .get_post(&id, viewer.0.as_deref())?
        .ok_or_else(|| ApiError::NotFound(format!("post {id} not found")))?;
    Ok(Json(post))
}

pub(crate) async fn list_user_posts(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<PostView>> {
    let service = FeedService::new(state.database.clone());
    let cursor = params.cursor()?;
    let page = service.posts_by_user(
        Some(&id),
        viewer.0.as_deref(),
        params.limit(DEFAULT_PROFILE_LIMIT),
        cursor.as_ref(),
    )?;
    Ok(Json(page))
}

pub(crate) async fn toggle_like(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<LikeState> {
    let service = FeedService::new(state.database.clone());
    let liked = service.toggle_like(&actor.user_id, &id)?;
    Ok(Json(liked))
}

pub(crate) async fn toggle_repost(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<RepostState> {
    let service = FeedService::new(state.database.clone());
    let reposted = service.toggle_repost(&actor.user_id, &id)?;
    Ok(Json(reposted))
}

pub(crate) async fn list_post_likers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<UserView>> {
    let service = FeedService::new(state.database.clone());
    let likers = service.post_likers(&id)?;
    Ok(Json(likers))
}
