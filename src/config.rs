use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

const CONFIG_DIR_ENV: &str = "LOTO_CONFIG_DIR";
const CONFIG_DIR_NAME: &str = ".config/loto-cli";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            email: String::new(),
            password: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Config {
            email: email.into(),
            password: password.into(),
            ..Config::default()
        }
    }

    /// Login needs both fields; checked before any request goes out.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::CredentialsMissing);
        }
        Ok(())
    }

    pub fn user_agent(&self) -> &str {
        if self.user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            &self.user_agent
        }
    }
}

/// `$LOTO_CONFIG_DIR`, else `~/.config/loto-cli`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(CONFIG_DIR_NAME)
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Creates a prefilled config file when none exists. Returns true when a
/// new file was written and the user still has to fill it in.
pub fn ensure_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let data = serde_json::to_string_pretty(&Config::default())?;
    write_private(path, data.as_bytes())?;
    tracing::info!(path = %path.display(), "created config template");
    Ok(true)
}

pub fn load() -> Result<Config> {
    load_from(&config_path())
}

/// Reads and validates the config, credentials included.
pub fn load_from(path: &Path) -> Result<Config> {
    let config = read(path)?;
    config.validate()?;
    Ok(config)
}

/// Reads the config without requiring credentials; the public results page
/// only needs the user agent.
pub fn read(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)?;
    let mut config: Config = serde_json::from_str(&data)?;
    if config.user_agent.trim().is_empty() {
        config.user_agent = DEFAULT_USER_AGENT.to_string();
    }
    Ok(config)
}

/// Writes `data` readable by the owner only, creating parent directories.
pub(crate) fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;

    // mode() only applies on creation; tighten files that already existed
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
