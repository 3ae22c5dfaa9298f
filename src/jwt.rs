//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with separate HS256 secrets, so a
//! token of one kind never verifies under the other kind's key.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::directory::Role;

/// Access token duration: 5 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 5 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Token kind, selecting the secret and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived, stateless
    Access,
    /// Long-lived, tracked in the session registry by JTI
    Refresh,
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user nickname)
    pub sub: String,
    /// User role
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// JWT ID, set on refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Build claims for `sub`/`role` valid for `ttl` seconds from now.
    pub fn issue(sub: &str, role: Role, ttl: u64) -> Result<Self, JwtError> {
        let now = unix_now().map_err(|_| JwtError::TimeError)?;
        Ok(Self {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: None,
        })
    }

    pub fn with_jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, std::time::SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// One signing secret.
#[derive(Clone)]
pub struct TokenSecret {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSecret {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign claims into a compact token string.
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Verify a token: signature, then schema, then expiry.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so that a token is
    /// expired as soon as `now >= exp`, and so that nothing about the payload
    /// is looked at before the signature holds.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data =
            jsonwebtoken::decode::<serde_json::Value>(token, &self.decoding_key, &validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::InvalidToken => TokenError::Malformed,
                    _ => TokenError::Tampered,
                })?;

        let claims: Claims =
            serde_json::from_value(data.claims).map_err(|_| TokenError::Malformed)?;

        let now = unix_now().map_err(|_| TokenError::Clock)?;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    access: TokenSecret,
    refresh: TokenSecret,
    access_ttl: u64,
    refresh_ttl: u64,
}

/// Result of generating an access token (no JTI).
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Claims embedded in the token
    pub claims: Claims,
}

/// Result of generating a refresh token (with JTI for tracking).
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID (session registry key)
    pub jti: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// A freshly issued token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessTokenResult,
    pub refresh: RefreshTokenResult,
}

impl JwtConfig {
    /// Create a new JWT configuration with the default lifetimes.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access: TokenSecret::new(access_secret),
            refresh: TokenSecret::new(refresh_secret),
            access_ttl: ACCESS_TOKEN_DURATION_SECS,
            refresh_ttl: REFRESH_TOKEN_DURATION_SECS,
        }
    }

    /// Override token lifetimes (seconds).
    pub fn with_lifetimes(mut self, access_ttl: u64, refresh_ttl: u64) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    /// The secret used for the given token kind.
    pub fn secret(&self, kind: TokenKind) -> &TokenSecret {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(
        &self,
        subject: &str,
        role: Role,
    ) -> Result<AccessTokenResult, JwtError> {
        let claims = Claims::issue(subject, role, self.access_ttl)?;
        let token = self.access.sign(&claims)?;
        Ok(AccessTokenResult { token, claims })
    }

    /// Generate a refresh token for a user, with a fresh JTI.
    pub fn generate_refresh_token(
        &self,
        subject: &str,
        role: Role,
    ) -> Result<RefreshTokenResult, JwtError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let claims = Claims::issue(subject, role, self.refresh_ttl)?.with_jti(jti.clone());
        let token = self.refresh.sign(&claims)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Issue an access token and a refresh token for the same identity.
    pub fn generate_pair(&self, subject: &str, role: Role) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.generate_access_token(subject, role)?,
            refresh: self.generate_refresh_token(subject, role)?,
        })
    }

    /// Derive a new pair from verified refresh claims. Identity and role come
    /// from the refresh token; timestamps and JTI are new.
    pub fn renew(&self, refresh_claims: &Claims) -> Result<TokenPair, JwtError> {
        self.generate_pair(&refresh_claims.sub, refresh_claims.role)
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.verify(token)
    }

    /// Validate and decode a refresh token. A refresh token without a JTI
    /// cannot be matched to a session and is rejected as malformed.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.refresh.verify(token)?;
        if claims.jti.as_deref().is_none_or(str::is_empty) {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }
}

/// Errors that can occur while producing tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    TimeError,
}

/// Reasons a presented token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not a compact JWS, or the payload does not match the claims schema
    #[error("Malformed token")]
    Malformed,
    /// Signature, header or algorithm check failed
    #[error("Token signature mismatch")]
    Tampered,
    /// Signature is valid but `now >= exp`
    #[error("Token expired")]
    Expired,
    /// System clock is before the Unix epoch
    #[error("System time error")]
    Clock,
}
