//! Endpoints for the signed-in user.
//!
//! - GET `/me` - Current principal
//! - GET `/sessions` - Live sessions of the current user
//! - DELETE `/sessions/{id}` - Revoke one of them

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get},
};
use serde::Serialize;
use tracing::info;

use super::AppState;
use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, Principal};
use crate::directory::UserDirectory;
use crate::sessions::{SessionRecord, SessionStore};

pub fn router<D, S>() -> Router<AppState<D, S>>
where
    D: UserDirectory,
    S: SessionStore,
{
    Router::new()
        .route("/me", get(me))
        .route("/sessions", get(list_sessions::<D, S>))
        .route("/sessions/{id}", delete(revoke_session::<D, S>))
}

#[derive(Serialize)]
struct MeResponse {
    #[serde(flatten)]
    principal: Principal,
    renewed: bool,
}

async fn me(auth: Auth) -> impl IntoResponse {
    Json(MeResponse {
        principal: auth.user.principal,
        renewed: auth.user.renewed,
    })
}

#[derive(Serialize)]
pub(super) struct ListSessionsResponse {
    pub sessions: Vec<SessionRecord>,
}

async fn list_sessions<D, S>(
    State(state): State<AppState<D, S>>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError>
where
    D: UserDirectory,
    S: SessionStore,
{
    let sessions = state
        .sessions
        .list(Some(auth.principal().nickname.as_str()))
        .await
        .store_err("Failed to list sessions")?;

    Ok(Json(ListSessionsResponse { sessions }))
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: bool,
}

/// Revoke one of the caller's sessions. Sessions of other users are reported
/// as missing.
async fn revoke_session<D, S>(
    State(state): State<AppState<D, S>>,
    auth: Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: UserDirectory,
    S: SessionStore,
{
    let nickname = &auth.principal().nickname;

    let owned = state
        .sessions
        .lookup(&id)
        .await
        .store_err("Failed to look up session")?
        .is_some_and(|session| &session.subject == nickname);
    if !owned {
        return Err(ApiError::not_found("Session not found"));
    }

    let revoked = state
        .sessions
        .revoke(&id)
        .await
        .store_err("Failed to revoke session")?;

    info!(nickname = %nickname, "Session revoked");
    Ok(Json(RevokeResponse { revoked }))
}
