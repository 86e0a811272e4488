//! Session cookie persistence between runs.
//!
//! The file is a pretty-printed JSON array. Domain cookies are written with a
//! leading dot, host-only cookies without one, so the jar can be rebuilt
//! exactly from the persisted fields.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::write_private;
use crate::error::Result;
use crate::jar::{CookieJar, JarCookie};

pub const COOKIES_FILE_NAME: &str = "cookies.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
}

impl From<&JarCookie> for PersistedCookie {
    fn from(c: &JarCookie) -> Self {
        let domain = if c.host_only {
            c.domain.clone()
        } else {
            format!(".{}", c.domain)
        };
        PersistedCookie {
            name: c.name.clone(),
            value: c.value.clone(),
            domain,
            path: c.path.clone(),
            expires: c.expires,
            secure: c.secure,
            http_only: c.http_only,
        }
    }
}

impl PersistedCookie {
    fn into_jar_cookie(self) -> JarCookie {
        let host_only = !self.domain.starts_with('.');
        JarCookie {
            name: self.name,
            value: self.value,
            domain: self.domain.trim_start_matches('.').to_lowercase(),
            path: if self.path.is_empty() { "/".to_string() } else { self.path },
            expires: self.expires,
            secure: self.secure,
            http_only: self.http_only,
            host_only,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }
}

/// Parses a cookie file, dropping expired entries. Corrupted content reads
/// as an empty file.
pub fn parse_cookies(data: &str, now: DateTime<Utc>) -> Vec<PersistedCookie> {
    match serde_json::from_str::<Vec<PersistedCookie>>(data) {
        Ok(saved) => saved.into_iter().filter(|c| !c.is_expired(now)).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring corrupted cookie file");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
    origin: Url,
}

impl CookieStore {
    /// `origin` selects which of the jar's cookies are persisted.
    pub fn new(path: impl Into<PathBuf>, origin: Url) -> Self {
        CookieStore {
            path: path.into(),
            origin,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies saved, unexpired cookies to `jar` and returns how many were
    /// applied. Never fails: a missing or unreadable file means a fresh login.
    pub fn load(&self, jar: &CookieJar) -> usize {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read cookie file");
                return 0;
            }
        };

        let cookies = parse_cookies(&data, Utc::now());
        let count = cookies.len();
        for cookie in cookies {
            jar.insert(cookie.into_jar_cookie());
        }
        tracing::debug!(count, path = %self.path.display(), "restored session cookies");
        count
    }

    /// Writes the jar's cookies for the origin, owner-readable only.
    pub fn save(&self, jar: &CookieJar) -> Result<()> {
        let saved: Vec<PersistedCookie> = jar
            .cookies_for_url(&self.origin)
            .iter()
            .map(PersistedCookie::from)
            .collect();
        let data = serde_json::to_string_pretty(&saved)?;
        write_private(&self.path, data.as_bytes())?;
        tracing::debug!(count = saved.len(), path = %self.path.display(), "saved session cookies");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
