//! Request cookies in, `Set-Cookie` headers out.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use tracing::error;

/// A cookie queued for the response.
pub struct Cookie {
    name: String,
    value: SecretString,
    max_age_seconds: i64,
    secure: bool,
}

impl Cookie {
    /// `HttpOnly`, `Path=/`, `SameSite=Lax` cookie living `ttl_minutes`.
    #[must_use]
    pub fn session(name: &str, value: SecretString, ttl_minutes: i64, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value,
            max_age_seconds: ttl_minutes.saturating_mul(60),
            secure,
        }
    }

    /// Expire `name` on the client right away.
    #[must_use]
    pub fn removal(name: &str, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value: SecretString::from(String::new()),
            max_age_seconds: 0,
            secure,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.max_age_seconds <= 0
    }

    /// Render the `Set-Cookie` value.
    ///
    /// # Errors
    /// Returns an error if the name or value contains bytes not allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name,
            self.value.expose_secret(),
            self.max_age_seconds
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("max_age_seconds", &self.max_age_seconds)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Cookies of one request plus the cookies queued for its response.
///
/// Reads see queued changes, so a login followed by a check within the same
/// request observes the new cookie, and a logout hides the old one.
#[derive(Default)]
pub struct CookieJar {
    incoming: HashMap<String, SecretString>,
    queued: Vec<Cookie>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header; later duplicates win.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                incoming.insert(key.to_string(), SecretString::from(val.trim().to_string()));
            }
        }
        Self {
            incoming,
            queued: Vec::new(),
        }
    }

    /// Current value of `name`, empty values treated as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match self.queued.iter().rev().find(|cookie| cookie.name == name) {
            Some(cookie) if cookie.is_removal() => return None,
            Some(cookie) => cookie.value.expose_secret(),
            None => self.incoming.get(name)?.expose_secret(),
        };
        if value.is_empty() { None } else { Some(value) }
    }

    pub fn queue(&mut self, cookie: Cookie) {
        self.queued.push(cookie);
    }

    #[must_use]
    pub fn queued(&self) -> &[Cookie] {
        &self.queued
    }

    /// Append one `Set-Cookie` per queued cookie.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        for cookie in &self.queued {
            match cookie.to_header_value() {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => error!(cookie = cookie.name(), "invalid cookie header: {err}"),
            }
        }
    }

    /// Response headers carrying the queued cookies.
    #[must_use]
    pub fn into_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.write_to(&mut headers);
        headers
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.incoming.keys().collect();
        names.sort();
        f.debug_struct("CookieJar")
            .field("incoming", &names)
            .field("queued", &self.queued)
            .finish()
    }
}
