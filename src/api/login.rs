//! Sign-in and sign-out endpoints.
//!
//! - POST `/sign-in` - Check credentials, issue a token pair, register the session
//! - POST `/sign-out` - Revoke the presented refresh token and clear cookies

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::AppState;
use super::error::{ApiError, ResultExt};
use crate::auth::{
    ClientInfo, Principal, REFRESH_COOKIE_NAME, TokenCookies, append_cleared_cookies, get_cookie,
    parse_bearer,
};
use crate::directory::UserDirectory;
use crate::sessions::{Session, SessionStore};

pub fn router<D, S>() -> Router<AppState<D, S>>
where
    D: UserDirectory,
    S: SessionStore,
{
    Router::new()
        .route("/sign-in", post(sign_in::<D, S>))
        .route("/sign-out", post(sign_out::<D, S>))
}

#[derive(Deserialize)]
struct SignInRequest {
    nickname: String,
    password: String,
}

async fn sign_in<D, S>(
    State(state): State<AppState<D, S>>,
    client: ClientInfo,
    Json(body): Json<SignInRequest>,
) -> Result<Response, ApiError>
where
    D: UserDirectory,
    S: SessionStore,
{
    if body.nickname.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Nickname and password are required"));
    }

    let Some(user) = state
        .directory
        .verify_credentials(&body.nickname, &body.password)
        .await
        .store_err("Failed to verify credentials")?
    else {
        debug!(nickname = %body.nickname, "Sign-in rejected");
        return Err(ApiError::unauthorized("Invalid nickname or password"));
    };

    let tokens = state
        .jwt
        .generate_pair(&user.nickname, user.role)
        .store_err("Failed to generate tokens")?;
    let cookies = TokenCookies::for_pair(&tokens, state.jwt.refresh_ttl(), state.secure_cookies)
        .ok_or_else(|| ApiError::internal("Failed to encode cookies"))?;

    let session = Session::new(&user.nickname, client.ip, client.user_agent)
        .created_at(tokens.refresh.issued_at);
    state
        .sessions
        .register(&tokens.refresh.jti, session)
        .await
        .store_err("Failed to register session")?;

    info!(nickname = %user.nickname, role = %user.role, "User signed in");

    let role = user.role;
    let mut response = Json(Principal::from_user(user, role)).into_response();
    cookies.append_to(response.headers_mut());
    Ok(response)
}

async fn sign_out<D, S>(State(state): State<AppState<D, S>>, headers: HeaderMap) -> Response
where
    D: UserDirectory,
    S: SessionStore,
{
    let claims = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .and_then(parse_bearer)
        .and_then(|token| state.jwt.validate_refresh_token(token).ok());

    if let Some(jti) = claims.as_ref().and_then(|c| c.jti.as_deref()) {
        match state.sessions.revoke(jti).await {
            Ok(revoked) => debug!(revoked, "Signed out"),
            Err(e) => warn!(error = %e, "Failed to revoke session on sign-out"),
        }
    }

    let mut response = Json(serde_json::json!({ "success": true })).into_response();
    append_cleared_cookies(response.headers_mut(), state.secure_cookies);
    response
}
