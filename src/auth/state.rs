//! Authentication state trait and macro.

use crate::directory::UserDirectory;
use crate::jwt::JwtConfig;
use crate::sessions::SessionStore;

/// Trait for state types that provide what the gate needs.
pub trait HasAuthBackend: Send + Sync {
    type Directory: UserDirectory;
    type Sessions: SessionStore;

    fn jwt(&self) -> &JwtConfig;
    fn directory(&self) -> &Self::Directory;
    fn sessions(&self) -> &Self::Sessions;
    fn secure_cookies(&self) -> bool;
    /// Trust `X-Forwarded-For` for the client IP recorded on sessions.
    fn trust_forwarded_for(&self) -> bool;
}

/// Macro to implement `HasAuthBackend` for generic state structs with the
/// standard fields.
///
/// The struct must be generic over `<D, S>` and have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `directory: Arc<D>`
/// - `sessions: Arc<S>`
/// - `secure_cookies: bool`
/// - `trust_forwarded_for: bool`
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState<D, S> {
///     pub jwt: Arc<JwtConfig>,
///     pub directory: Arc<D>,
///     pub sessions: Arc<S>,
///     pub secure_cookies: bool,
///     pub trust_forwarded_for: bool,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ident) => {
        impl<D, S> $crate::auth::HasAuthBackend for $state_type<D, S>
        where
            D: $crate::directory::UserDirectory,
            S: $crate::sessions::SessionStore,
        {
            type Directory = D;
            type Sessions = S;

            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn directory(&self) -> &D {
                &self.directory
            }
            fn sessions(&self) -> &S {
                &self.sessions
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
            fn trust_forwarded_for(&self) -> bool {
                self.trust_forwarded_for
            }
        }
    };
}
