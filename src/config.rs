//! Fetch settings, optionally loaded from a TOML file.
//!
//! The file is optional: a missing or empty file yields
//! `FetchConfig::default()`. Unknown keys are accepted but logged, since they
//! are most likely typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// HTTP policy for feed acquisition.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds, covering connect, headers and body.
    pub timeout_secs: u64,

    /// Responses larger than this many bytes are rejected.
    pub max_body_bytes: usize,

    /// Redirects followed before giving up. 0 disables redirects.
    pub max_redirects: usize,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Permit localhost and private network targets. Off by default so a
    /// polled URL cannot be pointed at internal services.
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            max_redirects: 10,
            user_agent: concat!("atomdiff/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_private_hosts: false,
        }
    }
}

impl FetchConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "timeout_secs",
        "max_body_bytes",
        "max_redirects",
        "user_agent",
        "allow_private_hosts",
    ];

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(FetchConfig::default())`
    /// - Empty file → `Ok(FetchConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - File over 1 MB → `Err(ConfigError::TooLarge)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text. Blank text gives the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: FetchConfig = toml::from_str(content)?;
        tracing::info!(
            timeout_secs = config.timeout_secs,
            max_body_bytes = config.max_body_bytes,
            "Loaded fetch configuration"
        );
        Ok(config)
    }

    /// Builds an HTTP client honouring the redirect and user-agent policy.
    ///
    /// The timeout is applied per request by the fetcher, so clients
    /// supplied by the caller get the same treatment.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let redirect = if self.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(self.max_redirects)
        };

        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .redirect(redirect)
            .build()
    }
}

// ============================================================================
// Tests
// ============================================================================
