//! Authentication user types.

use serde::Serialize;

use crate::directory::{Role, User};
use crate::jwt::Claims;

/// The authenticated identity of the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Directory user ID
    pub id: i64,
    pub nickname: String,
    /// Role granted by the token
    pub role: Role,
}

impl Principal {
    /// Combine the directory record with the role carried by the token.
    pub fn from_user(user: User, role: Role) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            role,
        }
    }
}

/// Request extension inserted by the gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    /// Claims of the access token in effect (the renewed one after a refresh)
    pub claims: Claims,
    /// Whether the access token was renewed while handling this request
    pub renewed: bool,
}
