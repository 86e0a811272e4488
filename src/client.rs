use reqwest::Url;
use std::path::PathBuf;

use crate::auth::{AuthController, AuthState};
use crate::config::{self, Config};
use crate::cookies::{COOKIES_FILE_NAME, CookieStore};
use crate::error::{Error, Result};
use crate::results::fetch_results;
use crate::session::{BILETE_URL, SessionManager};
use crate::tickets::{fetch_all_tickets, fetch_ticket_page};
use crate::types::{Extraction, Ticket, TicketPage};

/// One logged-in (or not yet logged-in) visitor of loto.ro.
pub struct Client {
    session: SessionManager,
    store: CookieStore,
    config: Config,
    state: AuthState,
}

impl Client {
    /// Session cookies live next to the config file.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_cookie_file(config, config::config_dir().join(COOKIES_FILE_NAME))
    }

    pub fn with_cookie_file(config: Config, cookie_file: impl Into<PathBuf>) -> Result<Self> {
        let origin = Url::parse(BILETE_URL).map_err(|e| Error::InvalidUrl {
            url: BILETE_URL.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Client {
            session: SessionManager::new(config.user_agent())?,
            store: CookieStore::new(cookie_file, origin),
            config,
            state: AuthState::Unauthenticated,
        })
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Restores the saved session or logs in with the configured credentials.
    pub async fn login(&mut self) -> Result<()> {
        let mut auth = AuthController::new(&self.session, self.session.jar(), &self.store, &self.config);
        let outcome = auth.restore_or_login().await;
        self.state = auth.state();
        outcome.map(|_| ())
    }

    /// Probes the current session without logging in.
    pub async fn is_authenticated(&self) -> Result<bool> {
        AuthController::new(&self.session, self.session.jar(), &self.store, &self.config)
            .probe()
            .await
    }

    /// Forgets the session here and on disk.
    pub fn logout(&mut self) -> Result<()> {
        self.session.jar().clear();
        self.state = AuthState::Unauthenticated;
        self.store.clear()
    }

    /// Public draw results; no login needed.
    pub async fn results(&self) -> Result<Vec<Extraction>> {
        fetch_results(&self.session).await
    }

    pub async fn tickets_page(&self, page: u32) -> Result<TicketPage> {
        fetch_ticket_page(&self.session, page).await
    }

    pub async fn all_tickets(&self) -> Result<Vec<Ticket>> {
        fetch_all_tickets(&self.session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::JarCookie;
    use tempfile::tempdir;

    #[test]
    fn test_logout_clears_jar_and_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(COOKIES_FILE_NAME);
        let mut client = Client::with_cookie_file(Config::new("a@b.ro", "pw"), &path).unwrap();

        client.session.jar().insert(JarCookie {
            name: "laravel_session".into(),
            value: "x".into(),
            domain: "bilete.loto.ro".into(),
            path: "/".into(),
            expires: None,
            secure: true,
            http_only: true,
            host_only: true,
        });
        client.store.save(client.session.jar()).unwrap();
        assert!(path.exists());

        client.logout().unwrap();
        assert!(client.session.jar().is_empty());
        assert!(!path.exists());
        assert_eq!(client.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_without_credentials_fails_fast() {
        let dir = tempdir().unwrap();
        let mut client =
            Client::with_cookie_file(Config::new("", ""), dir.path().join(COOKIES_FILE_NAME)).unwrap();
        assert!(matches!(client.login().await, Err(Error::CredentialsMissing)));
        assert_eq!(client.state(), AuthState::Unauthenticated);
    }
}
