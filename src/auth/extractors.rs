//! Axum extractors and middleware for role checks.
//!
//! Both run after `auth_gate` and read the `AuthenticatedUser` it inserted.

use std::marker::PhantomData;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::{AuthenticatedUser, Principal};
use crate::directory::Role;

/// Capability check of a principal's role against a required role.
pub struct RoleGuard;

impl RoleGuard {
    pub fn check(principal: &Principal, required: Role) -> Result<(), AuthErrorKind> {
        if principal.role == required {
            Ok(())
        } else {
            debug!(
                nickname = %principal.nickname,
                role = %principal.role,
                required = %required,
                "Role mismatch"
            );
            Err(AuthErrorKind::RoleMismatch)
        }
    }
}

/// Middleware enforcing a fixed role on every route it wraps.
///
/// ```ignore
/// Router::new()
///     .route("/sessions", get(list_all))
///     .route_layer(middleware::from_fn_with_state(Role::Owner, role_guard))
/// ```
pub async fn role_guard(State(required): State<Role>, request: Request, next: Next) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>() else {
        error!("role_guard used on a route without auth_gate");
        return ApiAuthError::new(AuthErrorKind::Internal).into_response();
    };

    match RoleGuard::check(&user.principal, required) {
        Ok(()) => next.run(request).await,
        Err(kind) => ApiAuthError::new(kind).into_response(),
    }
}

/// Role requirement for the `Auth` extractor.
pub trait RoleConstraint: Send + Sync + 'static {
    /// `None` accepts any role.
    const REQUIRED: Option<Role>;
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    const REQUIRED: Option<Role> = None;
}

/// Owners only.
pub struct OwnerOnly;

impl RoleConstraint for OwnerOnly {
    const REQUIRED: Option<Role> = Some(Role::Owner);
}

/// Customers only.
pub struct CustomerOnly;

impl RoleConstraint for CustomerOnly {
    const REQUIRED: Option<Role> = Some(Role::Customer);
}

/// Extractor for the authenticated user on routes behind `auth_gate`,
/// optionally constrained to a role.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub user: AuthenticatedUser,
    _role: PhantomData<R>,
}

impl<R: RoleConstraint> Auth<R> {
    pub fn principal(&self) -> &Principal {
        &self.user.principal
    }
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                error!("Auth extractor used on a route without auth_gate");
                ApiAuthError::new(AuthErrorKind::Internal)
            })?;

        if let Some(required) = R::REQUIRED {
            RoleGuard::check(&user.principal, required)?;
        }

        Ok(Self {
            user,
            _role: PhantomData,
        })
    }
}
