//! User directory: resolves the durable user record behind a token subject.
//!
//! The gate only needs two lookups (by nickname, and credential check for
//! sign-in). `MemoryDirectory` is the in-process implementation used by the
//! binary and the tests; a database-backed directory implements the same trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub role: Role,
}

/// Errors reported by a directory backend.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load users: {0}")]
    Load(String),
}

/// Lookup interface the authentication gate depends on.
pub trait UserDirectory: Send + Sync + 'static {
    /// Find a user by nickname (the token subject).
    fn find_by_nickname(
        &self,
        nickname: &str,
    ) -> impl Future<Output = Result<Option<User>, DirectoryError>> + Send;

    /// Check sign-in credentials. Returns `None` for an unknown nickname or a
    /// wrong password.
    fn verify_credentials(
        &self,
        nickname: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<User>, DirectoryError>> + Send;
}

/// Seed entry for `MemoryDirectory`, as read from a users file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub nickname: String,
    pub password: String,
    pub role: Role,
}

struct StoredUser {
    user: User,
    password: String,
}

/// In-memory user directory.
///
/// Passwords are kept as given; this directory is meant for development and
/// tests, not as a credential store.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, StoredUser>>,
    next_id: AtomicI64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from seed entries.
    pub fn from_seeds(seeds: impl IntoIterator<Item = UserSeed>) -> Self {
        let directory = Self::new();
        for seed in seeds {
            directory.insert(&seed.nickname, &seed.password, seed.role);
        }
        directory
    }

    /// Load seed entries from a JSON file containing an array of
    /// `{"nickname", "password", "role"}` objects.
    pub fn load(path: &str) -> Result<Self, DirectoryError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DirectoryError::Load(e.to_string()))?;
        let seeds: Vec<UserSeed> =
            serde_json::from_str(&content).map_err(|e| DirectoryError::Load(e.to_string()))?;
        Ok(Self::from_seeds(seeds))
    }

    /// Insert or replace a user. Replacing keeps the existing id.
    pub fn insert(&self, nickname: &str, password: &str, role: Role) -> User {
        let mut users = self.users.write();
        let id = match users.get(nickname) {
            Some(existing) => existing.user.id,
            None => self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let user = User {
            id,
            nickname: nickname.to_string(),
            role,
        };
        users.insert(
            nickname.to_string(),
            StoredUser {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    /// Remove a user. Returns whether it existed.
    pub fn remove(&self, nickname: &str) -> bool {
        self.users.write().remove(nickname).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl UserDirectory for MemoryDirectory {
    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().get(nickname).map(|s| s.user.clone()))
    }

    async fn verify_credentials(
        &self,
        nickname: &str,
        password: &str,
    ) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .read()
            .get(nickname)
            .filter(|s| s.password == password)
            .map(|s| s.user.clone()))
    }
}
