mod admin;
mod error;
mod login;
mod sessions;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::auth::{auth_gate, role_guard};
use crate::directory::{Role, UserDirectory};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::sessions::SessionStore;

pub use error::{ApiError, ResultExt};

/// State shared by every API route.
pub struct AppState<D, S> {
    pub jwt: Arc<JwtConfig>,
    pub directory: Arc<D>,
    pub sessions: Arc<S>,
    pub secure_cookies: bool,
    pub trust_forwarded_for: bool,
}

// Manual impl: `D` and `S` sit behind `Arc` and need not be `Clone`.
impl<D, S> Clone for AppState<D, S> {
    fn clone(&self) -> Self {
        Self {
            jwt: self.jwt.clone(),
            directory: self.directory.clone(),
            sessions: self.sessions.clone(),
            secure_cookies: self.secure_cookies,
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

impl_has_auth_backend!(AppState);

/// Create the API router.
///
/// `/sign-in` and `/sign-out` are public. Everything else runs behind
/// `auth_gate`, and `/admin` additionally requires the OWNER role.
pub fn create_api_router<D, S>(state: AppState<D, S>) -> Router
where
    D: UserDirectory,
    S: SessionStore,
{
    let admin = admin::router::<D, S>()
        .route_layer(middleware::from_fn_with_state(Role::Owner, role_guard));

    let protected = sessions::router::<D, S>()
        .nest("/admin", admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_gate::<AppState<D, S>>,
        ));

    Router::new()
        .merge(login::router::<D, S>())
        .merge(protected)
        .with_state(state)
}
