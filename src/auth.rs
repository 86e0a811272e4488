//! Login protocol and session probe for bilete.loto.ro.
//!
//! A run first tries to restore the previous session from the cookie file
//! and only logs in when the probe rejects it:
//!
//! ```text
//! Unauthenticated --restore ok--------------------------> Authenticated
//!        |                                                      ^
//!        +--login--> Authenticating --probe ok, cookies saved--+
//!                          |
//!                          +--any failure--> Unauthenticated
//! ```
//!
//! An expired session is only noticed by a later probe; nothing here logs
//! in again on its own.

use reqwest::StatusCode;
use scraper::Html;

use crate::config::Config;
use crate::cookies::CookieStore;
use crate::error::{Error, Result};
use crate::jar::CookieJar;
use crate::session::{BILETE_URL, PageRequest, Transport};
use crate::utils::{element_text, selector};

/// Only reachable with a live session; expired sessions get a 302 to /login.
pub const AUTH_CHECK_PATH: &str = "/history/ticket?page_no=1";
pub const LOGIN_PATH: &str = "/login";
/// Title of the ticket history page.
pub const AUTHENTICATED_TITLE: &str = "Biletele Mele";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

pub fn login_url() -> String {
    format!("{BILETE_URL}{LOGIN_PATH}")
}

pub fn auth_check_url() -> String {
    format!("{BILETE_URL}{AUTH_CHECK_PATH}")
}

/// Decides the probe from the raw (non-followed) response.
pub fn probe_verdict(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::OK {
        return false;
    }
    let doc = Html::parse_document(body);
    let title = doc.select(&selector("title")).next().map(element_text);
    title.is_some_and(|title| title.contains(AUTHENTICATED_TITLE))
}

/// Reads `<meta name="csrf-token" content="...">`.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let token = doc
        .select(&selector(r#"meta[name="csrf-token"]"#))
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|token| token.trim().to_string());
    token.filter(|token| !token.is_empty())
}

pub struct AuthController<'a, T: Transport> {
    transport: &'a T,
    jar: &'a CookieJar,
    store: &'a CookieStore,
    config: &'a Config,
    state: AuthState,
}

impl<'a, T: Transport> AuthController<'a, T> {
    pub fn new(transport: &'a T, jar: &'a CookieJar, store: &'a CookieStore, config: &'a Config) -> Self {
        AuthController {
            transport,
            jar,
            store,
            config,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Restores the saved session if it still passes the probe, otherwise
    /// runs the full login.
    pub async fn restore_or_login(&mut self) -> Result<AuthState> {
        self.config.validate()?;

        let restored = self.store.load(self.jar);
        if !self.jar.is_empty() && self.probe().await? {
            tracing::info!(restored, "session restored from saved cookies");
            self.state = AuthState::Authenticated;
            return Ok(self.state);
        }

        self.login().await
    }

    /// Fresh login. Leaves the controller Unauthenticated on any error.
    pub async fn login(&mut self) -> Result<AuthState> {
        self.config.validate()?;
        self.state = AuthState::Authenticating;

        match self.run_login().await {
            Ok(()) => {
                self.state = AuthState::Authenticated;
                Ok(self.state)
            }
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                Err(e)
            }
        }
    }

    async fn run_login(&self) -> Result<()> {
        let token = self.fetch_csrf_token().await?;
        self.post_login(&token).await?;

        // A network failure here is not a verdict on the credentials.
        if !self.check_session().await? {
            return Err(Error::InvalidCredentials);
        }
        tracing::info!("logged in to bilete.loto.ro");

        self.store.save(self.jar)
    }

    /// True when the current cookies grant access to the ticket history.
    /// Transport failures read as "not authenticated", except a geo block,
    /// which no login could get past either.
    pub async fn probe(&self) -> Result<bool> {
        match self.check_session().await {
            Err(Error::BlockedRegion) => Err(Error::BlockedRegion),
            Err(e) => {
                tracing::debug!(error = %e, "session probe failed");
                Ok(false)
            }
            ok => ok,
        }
    }

    /// Like [`probe`](Self::probe) but every transport error propagates.
    async fn check_session(&self) -> Result<bool> {
        let request = PageRequest::get(auth_check_url()).without_redirects();
        let page = self.transport.send(request).await?;
        let ok = probe_verdict(page.status, &page.body);
        tracing::debug!(status = %page.status, authenticated = ok, "session probe");
        Ok(ok)
    }

    async fn fetch_csrf_token(&self) -> Result<String> {
        let url = login_url();
        let page = self.transport.send(PageRequest::get(&url)).await?;
        if !page.is_ok() {
            return Err(Error::unexpected_status(url, page.status));
        }
        extract_csrf_token(&page.body).ok_or(Error::CsrfTokenMissing)
    }

    async fn post_login(&self, token: &str) -> Result<()> {
        let url = login_url();
        let form = [
            ("_token", token),
            ("email", self.config.email.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let request = PageRequest::post_form(&url, &form)
            .without_redirects()
            .with_referer(&url);

        let page = self.transport.send(request).await?;
        // Laravel answers a good login with 302; the jar has the new session by now
        match page.status {
            StatusCode::OK | StatusCode::FOUND => Ok(()),
            status => Err(Error::unexpected_status(url, status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::JarCookie;
    use crate::session::{BILETE_URL, Method};
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::Url;
    use tempfile::tempdir;

    const LOGIN_PAGE: &str = r#"<html><head><meta name="csrf-token" content="tok123"><title>Autentificare</title></head><body></body></html>"#;
    const HISTORY_PAGE: &str = "<html><head><title>Biletele Mele | Loteria Română</title></head><body></body></html>";
    const LOGIN_TITLE_PAGE: &str = "<html><head><title>Autentificare</title></head></html>";

    fn config() -> Config {
        Config::new("ion@example.ro", "parola")
    }

    fn store(dir: &std::path::Path) -> CookieStore {
        CookieStore::new(dir.join("cookies.json"), Url::parse(BILETE_URL).unwrap())
    }

    fn session_cookie() -> JarCookie {
        JarCookie {
            name: "laravel_session".into(),
            value: "s3cr3t".into(),
            domain: "bilete.loto.ro".into(),
            path: "/".into(),
            expires: None,
            secure: true,
            http_only: true,
            host_only: true,
        }
    }

    fn redirect() -> Reply {
        Reply::Page(StatusCode::FOUND, String::new())
    }

    #[test]
    fn test_probe_verdict() {
        assert!(!probe_verdict(StatusCode::FOUND, HISTORY_PAGE));
        assert!(!probe_verdict(StatusCode::MOVED_PERMANENTLY, HISTORY_PAGE));
        assert!(!probe_verdict(StatusCode::INTERNAL_SERVER_ERROR, HISTORY_PAGE));
        assert!(probe_verdict(StatusCode::OK, HISTORY_PAGE));
        assert!(!probe_verdict(StatusCode::OK, LOGIN_TITLE_PAGE));
        assert!(!probe_verdict(StatusCode::OK, "<html><body>Biletele Mele</body></html>"));
    }

    #[test]
    fn test_extract_csrf_token() {
        assert_eq!(extract_csrf_token(LOGIN_PAGE).as_deref(), Some("tok123"));
        assert_eq!(extract_csrf_token(r#"<meta name="csrf-token" content="  ">"#), None);
        assert_eq!(extract_csrf_token("<html></html>"), None);
    }

    #[tokio::test]
    async fn test_login_posts_form_and_saves_cookies() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        jar.insert(session_cookie());
        let config = config();
        let transport = ScriptedTransport::new()
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), redirect())
            .html(&auth_check_url(), HISTORY_PAGE);

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert_eq!(auth.login().await.unwrap(), AuthState::Authenticated);

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        let Method::PostForm(fields) = &posts[0].method else {
            panic!("expected form post");
        };
        assert_eq!(
            fields,
            &vec![
                ("_token".to_string(), "tok123".to_string()),
                ("email".to_string(), "ion@example.ro".to_string()),
                ("password".to_string(), "parola".to_string()),
            ]
        );
        assert_eq!(posts[0].referer.as_deref(), Some(login_url().as_str()));

        let saved = std::fs::read_to_string(store.path()).unwrap();
        assert!(saved.contains("laravel_session"));
    }

    #[tokio::test]
    async fn test_probe_runs_without_redirects() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new().on_get(&auth_check_url(), redirect());

        let auth = AuthController::new(&transport, &jar, &store, &config);
        assert!(!auth.probe().await.unwrap());
        assert_eq!(transport.sent()[0].redirects, crate::session::Redirects::Manual);
    }

    #[tokio::test]
    async fn test_missing_csrf_token() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new().html(&login_url(), "<html><head></head></html>");

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert!(matches!(auth.login().await, Err(Error::CsrfTokenMissing)));
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert!(transport.posts().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_post_status_is_transport_failure() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new()
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), Reply::Page(StatusCode::INTERNAL_SERVER_ERROR, String::new()));

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        let err = auth.login().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!err.is_authentication());
    }

    #[tokio::test]
    async fn test_negative_probe_after_post_is_invalid_credentials() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new()
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), Reply::Page(StatusCode::OK, LOGIN_TITLE_PAGE.into()))
            .on_get(&auth_check_url(), redirect());

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert!(matches!(auth.login().await, Err(Error::InvalidCredentials)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_network_failure_after_post_is_not_invalid_credentials() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new()
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), redirect())
            .on_get(&auth_check_url(), Reply::ConnectionReset);

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        let err = auth.login().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_authentication());
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_restore_treats_unreachable_origin_as_logged_out() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let seed = CookieJar::new();
        seed.insert(session_cookie());
        store.save(&seed).unwrap();

        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new()
            .on_get(&auth_check_url(), Reply::ConnectionReset)
            .html(&auth_check_url(), HISTORY_PAGE)
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), redirect());

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert_eq!(auth.restore_or_login().await.unwrap(), AuthState::Authenticated);
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_skips_login_when_probe_passes() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let seed = CookieJar::new();
        seed.insert(session_cookie());
        store.save(&seed).unwrap();

        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new().html(&auth_check_url(), HISTORY_PAGE);

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert_eq!(auth.restore_or_login().await.unwrap(), AuthState::Authenticated);
        assert_eq!(transport.count(&login_url()), 0);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_login_on_expired_session() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let seed = CookieJar::new();
        seed.insert(session_cookie());
        store.save(&seed).unwrap();

        let jar = CookieJar::new();
        let config = config();
        let transport = ScriptedTransport::new()
            .on_get(&auth_check_url(), redirect())
            .html(&auth_check_url(), HISTORY_PAGE)
            .html(&login_url(), LOGIN_PAGE)
            .on_post(&login_url(), redirect());

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert_eq!(auth.restore_or_login().await.unwrap(), AuthState::Authenticated);
        assert_eq!(transport.count(&auth_check_url()), 2);
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_any_request() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        let config = Config::new("", "");
        let transport = ScriptedTransport::new();

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert!(matches!(auth.restore_or_login().await, Err(Error::CredentialsMissing)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_region_surfaces_from_probe() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let jar = CookieJar::new();
        jar.insert(session_cookie());
        let config = config();
        let transport = ScriptedTransport::new().on_get(&auth_check_url(), Reply::Blocked);

        let mut auth = AuthController::new(&transport, &jar, &store, &config);
        assert!(matches!(auth.restore_or_login().await, Err(Error::BlockedRegion)));
    }
}
