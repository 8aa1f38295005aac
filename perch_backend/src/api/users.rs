use super::auth::{Actor, MaybeActor};
use super::{ApiError, ApiResult, AppState};
use crate::users::{
    FollowState, RegisterInput, RegisteredUser, UserProfileView, UserService, UserView,
};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    q: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsernameParams {
    username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UsernameTakenResponse {
    taken: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangeUsernameRequest {
    username: String,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<RegisteredUser> {
    let service = UserService::new(state.database.clone());
    let registered = service.register(input)?;
    Ok(Json(registered))
}

pub(crate) async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(id): Path<String>,
) -> ApiResult<UserProfileView> {
    let service = UserService::new(state.database.clone());
    let profile = service
        .get_profile(&id, viewer.0.as_deref())?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
    Ok(Json(profile))
}

pub(crate) async fn get_user_by_username(
    State(state): State<AppState>,
    viewer: MaybeActor,
    Path(username): Path<String>,
) -> ApiResult<UserProfileView> {
    let service = UserService::new(state.database.clone());
    let profile = service
        .get_profile_by_username(&username, viewer.0.as_deref())?
        .ok_or_else(|| ApiError::NotFound(format!("user @{username} not found")))?;
    Ok(Json(profile))
}

pub(crate) async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<UserView>> {
    let service = UserService::new(state.database.clone());
    let matches = service.search(&params.q, params.limit)?;
    Ok(Json(matches))
}

pub(crate) async fn recommended_users(
    State(state): State<AppState>,
    viewer: MaybeActor,
) -> ApiResult<Vec<UserView>> {
    let service = UserService::new(state.database.clone());
    let recommended = service.recommended(viewer.0.as_deref())?;
    Ok(Json(recommended))
}

pub(crate) async fn username_taken(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> ApiResult<UsernameTakenResponse> {
    let service = UserService::new(state.database.clone());
    let taken = service.username_taken(&params.username)?;
    Ok(Json(UsernameTakenResponse { taken }))
}

pub(crate) async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<UserView>> {
    let service = UserService::new(state.database.clone());
    let followers = service.followers_of(&id)?;
    Ok(Json(followers))
}

pub(crate) async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<UserView>> {
    let service = UserService::new(state.database.clone());
    let following = service.following_of(&id)?;
    Ok(Json(following))
}

pub(crate) async fn toggle_follow(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<FollowState> {
    let service = UserService::new(state.database.clone());
    let following = service.toggle_follow(&actor.user_id, &id)?;
    Ok(Json(following))
}

pub(crate) async fn change_username(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<ChangeUsernameRequest>,
) -> ApiResult<UserView> {
    let service = UserService::new(state.database.clone());
    let user = service.change_username(&actor.user_id, &input.username)?;
    Ok(Json(user))
}
