//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::directory::MemoryDirectory;
use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, JwtConfig, REFRESH_TOKEN_DURATION_SECS};
use crate::sessions::{DEFAULT_MAX_SESSIONS, SessionRegistry};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

const MIN_SECRET_LENGTH: usize = 32;

/// Environment variable holding the access token secret.
pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";

/// Environment variable holding the refresh token secret.
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessiongate",
    about = "Cookie-based JWT authentication gate with session rotation"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// JSON file with the users to serve: [{"nickname", "password", "role"}]
    #[arg(short, long, env = "USERS_FILE")]
    pub users_file: Option<String>,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = ACCESS_TOKEN_DURATION_SECS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub access_ttl: u64,

    /// Refresh token (and session) lifetime in seconds
    #[arg(long, default_value_t = REFRESH_TOKEN_DURATION_SECS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ttl: u64,

    /// Maximum number of live sessions kept in memory
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Set the Secure flag on cookies (enable when served over HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Record the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
///
/// Removes the environment variable after reading it, so call this before
/// any other thread is started.
pub fn load_secret(env_var: &str, file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: The binary calls this before building its runtime, while
        // no other thread exists to read the environment concurrently.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            env_var = %env_var,
            "Secret is required. Set the environment variable (recommended) or use the matching --*-secret-file option"
        );
        return None;
    };

    Some(secret)
}

/// Check that both secrets are long enough and not the same.
pub fn validate_secrets(access: &str, refresh: &str) -> Result<(), String> {
    for (name, secret) in [("Access", access), ("Refresh", refresh)] {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "{} token secret is shorter than {} characters. Use a longer secret",
                name, MIN_SECRET_LENGTH
            ));
        }
    }
    if access == refresh {
        return Err("Access and refresh token secrets must differ".to_string());
    }
    Ok(())
}

/// Load both secrets and validate them.
/// Returns None and logs an error if either is missing or invalid.
pub fn load_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref())?;
    let refresh = load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref())?;

    if let Err(e) = validate_secrets(&access, &refresh) {
        error!("{}", e);
        return None;
    }

    Some((access, refresh))
}

/// Load the user directory, logging errors if it fails.
pub fn load_directory(path: Option<&str>) -> Option<MemoryDirectory> {
    let Some(path) = path else {
        warn!("No users file given, nobody will be able to sign in");
        return Some(MemoryDirectory::new());
    };

    match MemoryDirectory::load(path) {
        Ok(directory) => {
            info!(path = %path, users = directory.len(), "Users loaded");
            Some(directory)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to load users");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    directory: MemoryDirectory,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig<MemoryDirectory> {
    let jwt = JwtConfig::new(access_secret.as_bytes(), refresh_secret.as_bytes())
        .with_lifetimes(args.access_ttl, args.refresh_ttl);

    ServerConfig {
        directory: Arc::new(directory),
        sessions: Arc::new(SessionRegistry::new(args.refresh_ttl, args.max_sessions)),
        jwt: Arc::new(jwt),
        secure_cookies: args.secure_cookies,
        trust_forwarded_for: args.trust_forwarded_for,
    }
}
