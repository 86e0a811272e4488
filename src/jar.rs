//! In-process cookie jar for the session transport.
//!
//! reqwest's bundled jar cannot enumerate cookie attributes, which the
//! persisted cookie file needs, so the session plugs this store in through
//! [`reqwest::cookie::CookieStore`] instead. Matching follows RFC 6265
//! without public-suffix checks: the jar only ever talks to loto.ro hosts.

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use reqwest::header::HeaderValue;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarCookie {
    pub name: String,
    pub value: String,
    /// Lowercase, without a leading dot.
    pub domain: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
    /// Set when the server sent no Domain attribute; only the exact host matches.
    pub host_only: bool,
}

impl JarCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }

    fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        let host = url.host_str().unwrap_or("");
        domain_matches(&self.domain, host, self.host_only)
            && path_matches(&self.path, url.path())
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }
}

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<JarCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JarCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces (by name, domain and path) a cookie. An already
    /// expired cookie only removes its predecessor.
    pub fn insert(&self, cookie: JarCookie) {
        let mut cookies = self.lock();
        cookies.retain(|c| {
            c.name != cookie.name || c.domain != cookie.domain || c.path != cookie.path
        });
        if !cookie.is_expired(Utc::now()) {
            cookies.push(cookie);
        }
    }

    /// Live cookies that would be sent to `url`, longest path first.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<JarCookie> {
        let now = Utc::now();
        let mut matched: Vec<JarCookie> = self
            .lock()
            .iter()
            .filter(|c| c.matches(url, now))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matched
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Parses one `Set-Cookie` line received from `url`.
    pub fn store_set_cookie(&self, url: &Url, line: &str) {
        let parsed = match cookie::Cookie::parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "ignoring malformed Set-Cookie");
                return;
            }
        };
        let host = url.host_str().unwrap_or("").to_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(d) => {
                let d = d.trim_start_matches('.').to_lowercase();
                if !domain_matches(&d, &host, false) {
                    tracing::debug!(url = %url, domain = %d, "rejecting cookie for foreign domain");
                    return;
                }
                (d, false)
            }
            None => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url.path()),
        };

        // Max-Age wins over Expires.
        let expires = match parsed.max_age() {
            Some(max_age) => Duration::try_seconds(max_age.whole_seconds())
                .and_then(|d| Utc::now().checked_add_signed(d)),
            None => parsed
                .expires_datetime()
                .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0)),
        };

        self.insert(JarCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            expires,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        });
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            if let Ok(line) = header.to_str() {
                self.store_set_cookie(url, line);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .cookies_for_url(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

fn domain_matches(cookie_domain: &str, host: &str, host_only: bool) -> bool {
    if host.eq_ignore_ascii_case(cookie_domain) {
        return true;
    }
    if host_only || host.len() <= cookie_domain.len() {
        return false;
    }
    let split = host.len() - cookie_domain.len();
    host.is_char_boundary(split)
        && host[split..].eq_ignore_ascii_case(cookie_domain)
        && host.as_bytes()[split - 1] == b'.'
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// RFC 6265 default-path: the request path up to, not including, its last '/'.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}
