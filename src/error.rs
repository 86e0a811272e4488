use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Transport
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: StatusCode },
    #[error("loto.ro requires a Romanian IP address. Please connect from Romania or use a VPN")]
    BlockedRegion,

    // Authentication
    #[error("credentials missing: please set email and password in config file")]
    CredentialsMissing,
    #[error("CSRF token not found on login page")]
    CsrfTokenMissing,
    #[error("login failed: invalid credentials or unexpected response")]
    InvalidCredentials,

    // Extraction
    #[error("results section not found on page")]
    SectionNotFound,
    #[error("failed to fetch page {page}")]
    Page {
        page: u32,
        #[source]
        source: Box<Error>,
    },

    // Local state
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn unexpected_status(url: impl Into<String>, status: StatusCode) -> Self {
        Error::UnexpectedStatus {
            url: url.into(),
            status,
        }
    }

    /// True for failures of the login protocol itself, as opposed to the
    /// network underneath it.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Error::CredentialsMissing | Error::CsrfTokenMissing | Error::InvalidCredentials
        )
    }
}
