//! Client configuration.
//!
//! Values come from (lowest to highest precedence) built-in defaults, the
//! environment, an optional YAML file, and command-line flags.  Missing
//! authentication settings are not fatal: the client starts with a
//! non-functional auth service and a warning.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Key the session is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "easydiet-auth";

/// Default HTTP timeout for backend and auth requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolved configuration for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the backend API, without a trailing slash.
    pub api_base: String,

    /// Base URL of the authentication service.
    pub auth_url: Option<String>,

    /// Public (anon) key for the authentication service.
    pub auth_anon_key: Option<String>,

    /// Name the session is stored under.
    pub storage_key: String,

    /// Directory holding the persisted session and client state.
    pub session_dir: Option<PathBuf>,

    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
}

/// Shape of the optional YAML configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Overrides `api_base`.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Overrides `auth_url`.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Overrides `auth_anon_key`.
    #[serde(default)]
    pub auth_anon_key: Option<String>,
    /// Overrides `storage_key`.
    #[serde(default)]
    pub storage_key: Option<String>,
    /// Overrides `session_dir`.
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
    /// Overrides `timeout`, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Creates a configuration with defaults and no auth service.
    pub fn new() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_url: None,
            auth_anon_key: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            session_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Config::new();
        if let Some(api_base) = lookup("EASYDIET_API_BASE") {
            config = config.with_api_base(api_base);
        } else {
            info!("EASYDIET_API_BASE not set, using default: {DEFAULT_API_BASE}");
        }
        config.auth_url = lookup("EASYDIET_AUTH_URL");
        config.auth_anon_key = lookup("EASYDIET_AUTH_ANON_KEY");
        if let Some(storage_key) = lookup("EASYDIET_STORAGE_KEY") {
            config.storage_key = storage_key;
        }
        config.session_dir = lookup("EASYDIET_SESSION_DIR").map(PathBuf::from);
        if let Some(timeout) = lookup("EASYDIET_TIMEOUT_SECS") {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => warn!("Invalid EASYDIET_TIMEOUT_SECS value: {e}"),
            }
        }
        config
    }

    /// Loads a YAML file and applies it on top of `self`.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config file {}", path.display()), err)
        })?;
        let file: ConfigFile = serde_yaml::from_str(&text)?;
        Ok(self.merge_file(file))
    }

    /// Applies every field present in `file`.
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(api_base) = file.api_base {
            self = self.with_api_base(api_base);
        }
        if file.auth_url.is_some() {
            self.auth_url = file.auth_url;
        }
        if file.auth_anon_key.is_some() {
            self.auth_anon_key = file.auth_anon_key;
        }
        if let Some(storage_key) = file.storage_key {
            self.storage_key = storage_key;
        }
        if file.session_dir.is_some() {
            self.session_dir = file.session_dir;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Sets the backend base URL.  A trailing slash is removed.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim().trim_end_matches('/').to_string();
        self
    }

    /// Sets the authentication service URL and anon key.
    pub fn with_auth(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self.auth_anon_key = Some(anon_key.into());
        self
    }

    /// Sets the session storage key.
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    /// Sets the session directory.
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Sets the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the auth URL and key when both are present.
    pub fn auth(&self) -> Option<(&str, &str)> {
        match (self.auth_url.as_deref(), self.auth_anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }

    /// The directory for persisted state, falling back to the platform data directory.
    pub fn state_dir(&self) -> Option<PathBuf> {
        self.session_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("easydiet")))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
