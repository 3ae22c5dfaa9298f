pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod directory;
pub mod jwt;
pub mod sessions;

use api::{AppState, create_api_router};
use axum::Router;
use directory::UserDirectory;
use jwt::JwtConfig;
use sessions::{SessionRegistry, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig<D, S = SessionRegistry> {
    /// User directory consulted to resolve principals and check passwords
    pub directory: Arc<D>,
    /// Registry of outstanding refresh tokens
    pub sessions: Arc<S>,
    /// Signing secrets and token lifetimes
    pub jwt: Arc<JwtConfig>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Take the client IP from `X-Forwarded-For` (only behind a trusted proxy)
    pub trust_forwarded_for: bool,
}

/// Create the application router with the given configuration.
pub fn create_app<D, S>(config: &ServerConfig<D, S>) -> Router
where
    D: UserDirectory,
    S: SessionStore,
{
    let state = AppState {
        jwt: config.jwt.clone(),
        directory: config.directory.clone(),
        sessions: config.sessions.clone(),
        secure_cookies: config.secure_cookies,
        trust_forwarded_for: config.trust_forwarded_for,
    };

    Router::new().nest("/api", create_api_router(state))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup<S: SessionStore>(sessions: &Arc<S>) {
    cleanup::run_cleanup(sessions.as_ref()).await;
    cleanup::spawn_cleanup_scheduler(sessions.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server<D, S>(
    config: ServerConfig<D, S>,
    listener: TcpListener,
) -> Result<(), std::io::Error>
where
    D: UserDirectory,
    S: SessionStore,
{
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server<D, S>(
    config: ServerConfig<D, S>,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error>
where
    D: UserDirectory,
    S: SessionStore,
{
    init_cleanup(&config.sessions).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
