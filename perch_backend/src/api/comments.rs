use super::auth::{Actor, MaybeActor};
use super::{ApiResult, AppState, PageParams};
use crate::comments::{
    CommentService, CommentView, CreateCommentInput, UserCommentView, DEFAULT_COMMENT_LIMIT,
};
use crate::feed::{LikeState, RepostState};
use crate::pagination::Page;
use axum::extract::{Path, Query, State};
use axum::Json;

pub(crate) async fn list_post_comments(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<CommentView>> {
    let service = CommentService::new(state.database.clone());
    let cursor = params.cursor()?;
    let page = service.list_for_post(
        Some(&id),
        viewer.0.as_deref(),
        params.limit(DEFAULT_COMMENT_LIMIT),
        cursor.as_ref(),
    )?;
    Ok(Json(page))
}

pub(crate) async fn add_parent_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> ApiResult<CommentView> {
    let service = CommentService::new(state.database.clone());
    let comment = service.add_parent_comment(&actor.user_id, &id, &input.content)?;
    Ok(Json(comment))
}

pub(crate) async fn add_child_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> ApiResult<CommentView> {
    let service = CommentService::new(state.database.clone());
    let comment = service.add_child_comment(&actor.user_id, &id, &input.content)?;
    Ok(Json(comment))
}

pub(crate) async fn list_user_comments(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<UserCommentView>> {
    let service = CommentService::new(state.database.clone());
    let cursor = params.cursor()?;
    let page = service.list_for_user(
        Some(&id),
        viewer.0.as_deref(),
        params.limit(DEFAULT_COMMENT_LIMIT),
        cursor.as_ref(),
    )?;
    Ok(Json(page))
}

pub(crate) async fn toggle_comment_like(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<LikeState> {
    let service = CommentService::new(state.database.clone());
    let liked = service.toggle_like(&actor.user_id, &id)?;
    Ok(Json(liked))
}

pub(crate) async fn toggle_comment_repost(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<RepostState> {
    let service = CommentService::new(state.database.clone());
    let reposted = service.toggle_repost(&actor.user_id, &id)?;
    Ok(Json(reposted))
}
