use super::{ApiError, AppState};
use crate::database::repositories::SessionRepository;
use crate::utils::token_hash;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// Authenticated caller, resolved from the `Authorization: Bearer` header.
/// Rejects the request with 401 when the header is missing or the token does
/// not match a session.
pub(crate) struct Actor {
    pub user_id: String,
}

/// Optional viewer context for public reads. Anonymous requests (no header,
/// or a token that no longer resolves) carry `None`; database failures still
/// surface as errors.
pub(crate) struct MaybeActor(pub Option<String>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn resolve_session(state: &AppState, token: &str) -> Result<Option<String>, ApiError> {
    let hash = token_hash(token);
    state
        .database
        .with_repositories(|repos| Ok(repos.sessions().user_id_for_token_hash(&hash)?))
        .map_err(ApiError::from)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Err(ApiError::Unauthorized("missing bearer token".into()));
        };
        match resolve_session(state, token)? {
            Some(user_id) => Ok(Actor { user_id }),
            None => Err(ApiError::Unauthorized("invalid session token".into())),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeActor(None));
        };
        Ok(MaybeActor(resolve_session(state, token)?))
    }
}
