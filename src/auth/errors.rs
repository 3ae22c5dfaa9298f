//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::append_cleared_cookies;

/// Non-standard status telling the client its session is gone and it must
/// sign in again, as opposed to a plain expiry.
pub const SESSION_UNKNOWN_STATUS: u16 = 419;

/// Every way authentication or authorization can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingToken,
    MalformedToken,
    Tampered,
    Expired,
    InvalidRefresh,
    UnknownSession,
    UnknownUser,
    RoleMismatch,
    Internal,
}

impl AuthErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::MalformedToken => StatusCode::BAD_REQUEST,
            Self::Tampered | Self::Expired | Self::InvalidRefresh | Self::RoleMismatch => {
                StatusCode::UNAUTHORIZED
            }
            Self::UnknownSession => StatusCode::from_u16(SESSION_UNKNOWN_STATUS)
                .unwrap_or(StatusCode::UNAUTHORIZED),
            Self::UnknownUser => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Access token is missing",
            Self::MalformedToken => "Token must use the Bearer scheme",
            Self::Tampered => "Invalid token",
            Self::Expired => "Access token expired, sign in again",
            Self::InvalidRefresh => "Invalid or expired refresh token",
            Self::UnknownSession => "Session is not recognized, sign in again",
            Self::UnknownUser => "User not found",
            Self::RoleMismatch => "Insufficient permissions",
            Self::Internal => "Internal server error",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedToken => "malformed_token",
            Self::Tampered => "invalid_token",
            Self::Expired => "expired",
            Self::InvalidRefresh => "invalid_refresh",
            Self::UnknownSession => "unknown_session",
            Self::UnknownUser => "unknown_user",
            Self::RoleMismatch => "role_mismatch",
            Self::Internal => "internal_error",
        }
    }

    /// Whether the response should delete the client's token cookies.
    pub fn clears_cookies(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken
                | Self::Tampered
                | Self::InvalidRefresh
                | Self::UnknownSession
                | Self::UnknownUser
        )
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// API authentication error (JSON body, clears cookies where appropriate).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
    secure_cookies: bool,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self {
            kind,
            secure_cookies: false,
        }
    }

    /// Mark cleared cookies with the `Secure` attribute.
    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            code: &'static str,
        }

        let mut response = (
            self.kind.status_code(),
            Json(ErrorResponse {
                error: self.kind.message(),
                code: self.kind.code(),
            }),
        )
            .into_response();

        if self.kind.clears_cookies() {
            append_cleared_cookies(response.headers_mut(), self.secure_cookies);
        }

        response
    }
}
