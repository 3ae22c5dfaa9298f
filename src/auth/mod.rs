//! JWT authentication with role-based access control.
//!
//! Dual-token system: short-lived access tokens (stateless) and long-lived
//! refresh tokens tracked in the session registry. `auth_gate` renews an
//! expired access token from the refresh token and rotates the refresh token
//! on every use.

mod client;
mod cookie;
mod errors;
mod extractors;
mod gate;
mod state;
mod types;

pub use client::{ClientInfo, HasHeadersAndExtensions};
pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, TokenCookies, append_cleared_cookies, get_cookie,
    parse_bearer,
};
pub use errors::{ApiAuthError, AuthErrorKind, SESSION_UNKNOWN_STATUS};
pub use extractors::{AnyRole, Auth, CustomerOnly, OwnerOnly, RoleConstraint, RoleGuard, role_guard};
pub use gate::auth_gate;
pub use state::HasAuthBackend;
pub use types::{AuthenticatedUser, Principal};
