mod alerts;
mod auth;
mod comments;
mod notifications;
mod posts;
mod users;

use crate::config::PerchConfig;
use crate::database::Database;
use crate::error::ServiceError;
use crate::pagination::Cursor;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: PerchConfig,
    pub database: Database,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorResponse { message: msg })
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse { message: msg }),
            ApiError::RateLimited(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, ErrorResponse { message: msg })
            }
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::RateLimited(msg) => ApiError::RateLimited(msg),
            ServiceError::Database(err) => ApiError::Internal(err.into()),
            ServiceError::Internal(err) => ApiError::Internal(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

/// Shared `?limit=&cursor=` query pair for every paginated listing.
#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    cursor: Option<String>,
}

impl PageParams {
    pub(crate) fn limit(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, 100)
    }

    pub(crate) fn cursor(&self) -> Result<Option<Cursor>, ApiError> {
        match self.cursor.as_deref() {
            Some(token) => Ok(Some(Cursor::decode(token)?)),
            None => Ok(None),
        }
    }
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(config: PerchConfig, database: Database) -> Result<()> {
    let state = AppState {
        config: config.clone(),
        database,
    };

    let router = Router::new()
        .route("/health", get(posts::health_handler))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/:id", get(posts::get_post))
        .route("/posts/:id/like", post(posts::toggle_like))
        .route("/posts/:id/repost", post(posts::toggle_repost))
        .route("/posts/:id/likes", get(posts::list_post_likers))
        .route(
            "/posts/:id/comments",
            get(comments::list_post_comments).post(comments::add_parent_comment),
        )
        .route("/comments/:id/replies", post(comments::add_child_comment))
        .route("/comments/:id/like", post(comments::toggle_comment_like))
        .route("/comments/:id/repost", post(comments::toggle_comment_repost))
        .route("/users", post(users::register))
        .route("/users/search", get(users::search_users))
        .route("/users/recommended", get(users::recommended_users))
        .route("/users/username-taken", get(users::username_taken))
        .route("/users/by-username/:username", get(users::get_user_by_username))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/posts", get(posts::list_user_posts))
        .route("/users/:id/comments", get(comments::list_user_comments))
        .route("/users/:id/followers", get(users::list_followers))
        .route("/users/:id/following", get(users::list_following))
        .route("/users/:id/follow", post(users::toggle_follow))
        .route("/me/username", put(users::change_username))
        .route("/notifications", get(notifications::list_notifications))
        .route("/alert", get(alerts::get_alert))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Try to bind to the configured port, or find the next available port
    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
