//! Admin API endpoints.
//!
//! Mounted behind `role_guard(Role::Owner)`.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tracing::debug;

use super::AppState;
use super::error::{ApiError, ResultExt};
use super::sessions::ListSessionsResponse;
use crate::auth::{Auth, OwnerOnly};
use crate::directory::UserDirectory;
use crate::sessions::SessionStore;

pub fn router<D, S>() -> Router<AppState<D, S>>
where
    D: UserDirectory,
    S: SessionStore,
{
    Router::new().route("/sessions", get(list_all_sessions::<D, S>))
}

/// List every live session.
async fn list_all_sessions<D, S>(
    State(state): State<AppState<D, S>>,
    auth: Auth<OwnerOnly>,
) -> Result<impl IntoResponse, ApiError>
where
    D: UserDirectory,
    S: SessionStore,
{
    let sessions = state
        .sessions
        .list(None)
        .await
        .store_err("Failed to list sessions")?;

    debug!(owner = %auth.principal().nickname, count = sessions.len(), "Listed all sessions");
    Ok(Json(ListSessionsResponse { sessions }))
}
