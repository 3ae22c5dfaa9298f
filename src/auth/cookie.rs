//! Cookie parsing and formatting for the token pair.
//!
//! Both cookies carry `Bearer <token>`. The space is written percent-encoded
//! because it is not a valid cookie-octet; either form is accepted on input.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::jwt::TokenPair;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

const BEARER_SCHEME: &str = "Bearer";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Split a `Bearer <token>` cookie value. Returns `None` when the scheme or
/// the separator is missing, or the token part is empty.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value
        .split_once(' ')
        .or_else(|| value.split_once("%20"))?;
    if scheme != BEARER_SCHEME || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

/// Format a `Set-Cookie` value carrying `token`.
pub fn bearer_cookie(name: &str, token: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}%20{}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, BEARER_SCHEME, token, max_age, secure
    )
}

/// Format a `Set-Cookie` value that deletes the cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        name, secure
    )
}

/// Append cookies that delete both tokens.
pub fn append_cleared_cookies(headers: &mut HeaderMap, secure: bool) {
    for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie(name, secure)) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

/// `Set-Cookie` values for a freshly issued token pair.
///
/// Built before any session is registered so that a pair whose cookies cannot
/// be encoded never reaches the registry.
#[derive(Debug, Clone)]
pub struct TokenCookies {
    access: HeaderValue,
    refresh: HeaderValue,
}

impl TokenCookies {
    /// Both cookies live for `max_age` seconds (the refresh lifetime): the
    /// access cookie must outlive its token so an expired token can still be
    /// presented for renewal.
    pub fn for_pair(tokens: &TokenPair, max_age: u64, secure: bool) -> Option<Self> {
        let access = bearer_cookie(ACCESS_COOKIE_NAME, &tokens.access.token, max_age, secure);
        let refresh = bearer_cookie(REFRESH_COOKIE_NAME, &tokens.refresh.token, max_age, secure);
        Some(Self {
            access: HeaderValue::from_str(&access).ok()?,
            refresh: HeaderValue::from_str(&refresh).ok()?,
        })
    }

    pub fn append_to(self, headers: &mut HeaderMap) {
        headers.append(header::SET_COOKIE, self.access);
        headers.append(header::SET_COOKIE, self.refresh);
    }
}
