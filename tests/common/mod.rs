#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use sessiongate::{
    ServerConfig,
    api::AppState,
    create_app,
    directory::{DirectoryError, MemoryDirectory, Role, User, UserDirectory},
    jwt::{Claims, JwtConfig, TokenKind},
    sessions::{Session, SessionRecord, SessionRegistry, SessionStore, SessionStoreError},
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret-012345678";

pub const ALICE_PASSWORD: &str = "alice-password";
pub const BOB_PASSWORD: &str = "bob-password";

pub struct TestApp {
    pub app: Router,
    pub directory: Arc<MemoryDirectory>,
    pub sessions: Arc<SessionRegistry>,
    pub jwt: JwtConfig,
}

/// Tokens of a registered session.
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
    pub jti: String,
}

pub type TestState = AppState<MemoryDirectory, SessionRegistry>;

pub fn test_jwt() -> JwtConfig {
    JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET)
}

/// Config over arbitrary backends, with the test secrets.
pub fn test_config<D, S>(directory: Arc<D>, sessions: Arc<S>) -> ServerConfig<D, S> {
    ServerConfig {
        directory,
        sessions,
        jwt: Arc::new(test_jwt()),
        secure_cookies: false,
        trust_forwarded_for: true,
    }
}

/// Directory with `alice` (OWNER) and `bob` (CUSTOMER).
pub fn seeded_directory() -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert("alice", ALICE_PASSWORD, Role::Owner);
    directory.insert("bob", BOB_PASSWORD, Role::Customer);
    directory
}

/// App with `alice` (OWNER) and `bob` (CUSTOMER).
pub fn create_test_app() -> TestApp {
    let directory = seeded_directory();
    let jwt = test_jwt();
    let sessions = Arc::new(SessionRegistry::new(jwt.refresh_ttl(), 1000));
    let config = test_config(directory.clone(), sessions.clone());

    TestApp {
        app: create_app(&config),
        directory,
        sessions,
        jwt,
    }
}

/// Directory whose backend is down.
pub struct FailingDirectory;

impl UserDirectory for FailingDirectory {
    async fn find_by_nickname(&self, _nickname: &str) -> Result<Option<User>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".into()))
    }

    async fn verify_credentials(
        &self,
        _nickname: &str,
        _password: &str,
    ) -> Result<Option<User>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".into()))
    }
}

/// Session store whose backend is down.
pub struct FailingSessions;

fn unavailable<T>() -> Result<T, SessionStoreError> {
    Err(SessionStoreError::Unavailable("connection refused".into()))
}

impl SessionStore for FailingSessions {
    async fn register(&self, _id: &str, _session: Session) -> Result<(), SessionStoreError> {
        unavailable()
    }

    async fn lookup(&self, _id: &str) -> Result<Option<Session>, SessionStoreError> {
        unavailable()
    }

    async fn revoke(&self, _id: &str) -> Result<bool, SessionStoreError> {
        unavailable()
    }

    async fn rotate(
        &self,
        _old_id: &str,
        _new_id: &str,
        _session: Session,
    ) -> Result<bool, SessionStoreError> {
        unavailable()
    }

    async fn list(&self, _subject: Option<&str>) -> Result<Vec<SessionRecord>, SessionStoreError> {
        unavailable()
    }

    async fn sweep(&self) -> Result<usize, SessionStoreError> {
        unavailable()
    }
}

impl TestApp {
    /// State for mounting `auth_gate` in front of custom routes.
    pub fn state(&self) -> TestState {
        AppState {
            jwt: Arc::new(self.jwt.clone()),
            directory: self.directory.clone(),
            sessions: self.sessions.clone(),
            secure_cookies: false,
            trust_forwarded_for: true,
        }
    }

    /// Issue a token pair and register its session, as sign-in would.
    pub async fn issue_session(&self, nickname: &str, role: Role) -> IssuedTokens {
        let pair = self.jwt.generate_pair(nickname, role).unwrap();
        self.sessions
            .register(
                &pair.refresh.jti,
                Session::new(nickname, None, None).created_at(pair.refresh.issued_at),
            )
            .await
            .unwrap();

        IssuedTokens {
            access: pair.access.token,
            refresh: pair.refresh.token,
            jti: pair.refresh.jti,
        }
    }

    /// An access token that is correctly signed but already expired.
    pub fn expired_access_token(&self, nickname: &str, role: Role) -> String {
        let claims = Claims::issue(nickname, role, 0).unwrap();
        self.jwt.secret(TokenKind::Access).sign(&claims).unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send("GET", uri, cookie, Body::empty()).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Body,
    ) -> Response<Body> {
        send(&self.app, method, uri, cookie, body).await
    }

    pub async fn sign_in(&self, nickname: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({ "nickname": nickname, "password": password });
        self.send("POST", "/api/sign-in", None, Body::from(body.to_string()))
            .await
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(body).unwrap()
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Body,
) -> Response<Body> {
    app.clone()
        .oneshot(request(method, uri, cookie, body))
        .await
        .unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer%20{}", token)
}

/// Cookie header carrying both tokens.
pub fn auth_cookies(access: &str, refresh: &str) -> String {
    format!(
        "accessToken={}; refreshToken={}",
        bearer(access),
        bearer(refresh)
    )
}

pub fn access_cookie_only(access: &str) -> String {
    format!("accessToken={}", bearer(access))
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Turn Set-Cookie headers into the Cookie header a browser would send next.
pub fn cookie_header_from(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Token carried by a `name=Bearer%20<token>` Set-Cookie header.
pub fn token_from(set_cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=Bearer%20", name);
    set_cookies.iter().find_map(|c| {
        c.split(';')
            .next()?
            .strip_prefix(&prefix)
            .map(str::to_string)
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert status and error code of an authentication failure.
pub async fn assert_auth_error(response: Response<Body>, status: u16, code: &str) {
    assert_eq!(response.status().as_u16(), status);
    let body = body_json(response).await;
    assert_eq!(body["code"], code);
}
