//! The authentication gate.
//!
//! `auth_gate` runs once per request in front of protected routes:
//!
//! 1. `accessToken` must be present (400) and `Bearer`-framed (400, cookies
//!    cleared); a present `refreshToken` must be framed the same way.
//! 2. A valid access token resolves the principal through the directory.
//! 3. An expired access token falls through to the refresh token, which must
//!    verify and match a registered session. The gate then issues a new pair
//!    and runs the handler. Only once the handler has produced a response is
//!    the session entry rotated and both cookies set on it, so a request
//!    dropped mid-handler leaves the old refresh token usable.
//! 4. Anything else is rejected. A forged token is never reported as expired
//!    because the codec checks signatures before expiry.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use super::client::ClientInfo;
use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, TokenCookies, get_cookie, parse_bearer};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::{AuthenticatedUser, Principal};
use crate::directory::UserDirectory;
use crate::jwt::{Claims, TokenError};
use crate::sessions::{Session, SessionStore};

/// Successful outcome of `authenticate`.
struct Authenticated {
    user: AuthenticatedUser,
    /// Pending rotation when the token pair was renewed
    renewal: Option<Renewal>,
}

/// A renewed token pair whose session entry has not been rotated yet.
struct Renewal {
    subject: String,
    old_jti: String,
    new_jti: String,
    session: Session,
    cookies: TokenCookies,
}

impl Renewal {
    /// Move the registry entry to the new refresh token and hand back the
    /// cookies to set. Loses to any request that rotated the old token first.
    async fn commit<S: HasAuthBackend>(self, state: &S) -> Result<TokenCookies, AuthErrorKind> {
        let rotated = state
            .sessions()
            .rotate(&self.old_jti, &self.new_jti, self.session)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to rotate session");
                AuthErrorKind::Internal
            })?;
        if !rotated {
            info!(subject = %self.subject, "Refresh token was already rotated");
            return Err(AuthErrorKind::UnknownSession);
        }

        info!(subject = %self.subject, "Renewed access token");
        Ok(self.cookies)
    }
}

/// Middleware that authenticates the request and inserts
/// `AuthenticatedUser` into its extensions.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate::<AppState>));
/// ```
pub async fn auth_gate<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + 'static,
{
    let client = ClientInfo::extract(&request, state.trust_forwarded_for());

    let authenticated = match authenticate(request.headers(), &client, &state).await {
        Ok(authenticated) => authenticated,
        Err(kind) => {
            return ApiAuthError::new(kind)
                .secure_cookies(state.secure_cookies())
                .into_response();
        }
    };

    request.extensions_mut().insert(authenticated.user);
    let mut response = next.run(request).await;

    if let Some(renewal) = authenticated.renewal {
        match renewal.commit(&state).await {
            Ok(cookies) => cookies.append_to(response.headers_mut()),
            Err(kind) => {
                return ApiAuthError::new(kind)
                    .secure_cookies(state.secure_cookies())
                    .into_response();
            }
        }
    }

    response
}

async fn authenticate<S: HasAuthBackend>(
    headers: &HeaderMap,
    client: &ClientInfo,
    state: &S,
) -> Result<Authenticated, AuthErrorKind> {
    let access = get_cookie(headers, ACCESS_COOKIE_NAME).ok_or(AuthErrorKind::MissingToken)?;
    let access = parse_bearer(access).ok_or(AuthErrorKind::MalformedToken)?;
    let refresh = match get_cookie(headers, REFRESH_COOKIE_NAME) {
        Some(value) => Some(parse_bearer(value).ok_or(AuthErrorKind::MalformedToken)?),
        None => None,
    };

    match state.jwt().validate_access_token(access) {
        Ok(claims) => {
            let principal = resolve_principal(state, &claims).await?;
            Ok(Authenticated {
                user: AuthenticatedUser {
                    principal,
                    claims,
                    renewed: false,
                },
                renewal: None,
            })
        }
        Err(TokenError::Expired) => {
            let Some(refresh) = refresh else {
                debug!("Access token expired and no refresh token was sent");
                return Err(AuthErrorKind::Expired);
            };
            renew(state, refresh, client).await
        }
        Err(TokenError::Clock) => {
            error!("System clock is before the Unix epoch");
            Err(AuthErrorKind::Internal)
        }
        Err(e) => {
            debug!(reason = %e, "Rejected access token");
            Err(AuthErrorKind::Tampered)
        }
    }
}

/// Exchange a refresh token for a new pair. The registry is not touched.
async fn renew<S: HasAuthBackend>(
    state: &S,
    refresh_token: &str,
    client: &ClientInfo,
) -> Result<Authenticated, AuthErrorKind> {
    let refresh_claims = state
        .jwt()
        .validate_refresh_token(refresh_token)
        .map_err(|e| match e {
            TokenError::Clock => {
                error!("System clock is before the Unix epoch");
                AuthErrorKind::Internal
            }
            e => {
                debug!(reason = %e, "Rejected refresh token");
                AuthErrorKind::InvalidRefresh
            }
        })?;
    let jti = refresh_claims
        .jti
        .as_deref()
        .ok_or(AuthErrorKind::InvalidRefresh)?;

    let session = state
        .sessions()
        .lookup(jti)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up session");
            AuthErrorKind::Internal
        })?
        .ok_or_else(|| {
            info!(subject = %refresh_claims.sub, "Refresh token has no registered session");
            AuthErrorKind::UnknownSession
        })?;

    if session.subject != refresh_claims.sub {
        warn!(
            subject = %refresh_claims.sub,
            session_subject = %session.subject,
            "Refresh token subject does not match its session"
        );
        return Err(AuthErrorKind::UnknownSession);
    }

    let principal = resolve_principal(state, &refresh_claims).await?;

    let tokens = state.jwt().renew(&refresh_claims).map_err(|e| {
        error!(error = %e, "Failed to generate renewed tokens");
        AuthErrorKind::Internal
    })?;
    let cookies = TokenCookies::for_pair(&tokens, state.jwt().refresh_ttl(), state.secure_cookies())
        .ok_or_else(|| {
            error!("Renewed tokens cannot be encoded as cookies");
            AuthErrorKind::Internal
        })?;

    let new_session = Session::new(
        &refresh_claims.sub,
        client.ip.clone(),
        client.user_agent.clone(),
    )
    .created_at(tokens.refresh.issued_at);

    debug!(subject = %refresh_claims.sub, role = %refresh_claims.role, "Issued renewed tokens");

    Ok(Authenticated {
        user: AuthenticatedUser {
            principal,
            claims: tokens.access.claims,
            renewed: true,
        },
        renewal: Some(Renewal {
            subject: refresh_claims.sub.clone(),
            old_jti: jti.to_string(),
            new_jti: tokens.refresh.jti,
            session: new_session,
            cookies,
        }),
    })
}

async fn resolve_principal<S: HasAuthBackend>(
    state: &S,
    claims: &Claims,
) -> Result<Principal, AuthErrorKind> {
    let user = state
        .directory()
        .find_by_nickname(&claims.sub)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up user");
            AuthErrorKind::Internal
        })?
        .ok_or_else(|| {
            debug!(subject = %claims.sub, "Token subject is not in the directory");
            AuthErrorKind::UnknownUser
        })?;

    Ok(Principal::from_user(user, claims.role))
}
