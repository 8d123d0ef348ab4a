//! Client configuration.
//!
//! The library never loads configuration itself; the host builds a
//! [`ClientConfig`] (usually by deserializing it) and hands it to
//! [`crate::PardotClient::new`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::envelope::ExpiryDetection;
use crate::error::ConfigError;
use crate::session::Credentials;
use crate::transport::{Connection, DEFAULT_TIMEOUT_SECS};

/// Base URI of the API
pub const DEFAULT_BASE_URL: &str = "https://pi.pardot.com/api/";

/// API version segment
pub const DEFAULT_API_VERSION: u32 = 3;

/// Log file used when logging is on and no path is given
pub const DEFAULT_LOGFILE: &str = "pardot.log";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub email: String,
    pub password: String,
    pub user_key: String,
    pub connection: Connection,
    /// Echo diagnostic lines
    pub debug: bool,
    /// Persist diagnostic lines to `logfile`
    pub logging: bool,
    /// `None` (or an empty string in the config file) means the system log
    #[serde(deserialize_with = "empty_path_as_none")]
    pub logfile: Option<PathBuf>,
    pub base_url: String,
    pub api_version: u32,
    pub request_timeout_secs: u64,
    /// Plain-text api_key cache; disabled when `None`
    pub token_cache: Option<PathBuf>,
    pub expiry: ExpiryDetection,
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            user_key: String::new(),
            connection: Connection::default(),
            debug: false,
            logging: false,
            logfile: Some(PathBuf::from(DEFAULT_LOGFILE)),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_cache: None,
            expiry: ExpiryDetection::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("email", &self.email)
            .field("password", &"***")
            .field("user_key", &"***")
            .field("connection", &self.connection)
            .field("debug", &self.debug)
            .field("logging", &self.logging)
            .field("logfile", &self.logfile)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_cache", &self.token_cache)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            user_key: user_key.into(),
            ..Self::default()
        }
    }

    /// Check everything a client needs before it may issue a request
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email.trim().is_empty() {
            return Err(ConfigError::Missing("email"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        if self.user_key.trim().is_empty() {
            return Err(ConfigError::Missing("user_key"));
        }
        if let Err(e) = url::Url::parse(&self.base_url) {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: e.to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.email, &self.password, &self.user_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connection, Connection::Http);
        assert!(!config.debug);
        assert!(!config.logging);
        assert_eq!(config.logfile, Some(PathBuf::from("pardot.log")));
        assert_eq!(config.base_url, "https://pi.pardot.com/api/");
        assert_eq!(config.api_version, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.token_cache.is_none());
    }

    #[test]
    fn test_validate_requires_credentials() {
        assert_eq!(
            ClientConfig::default().validate(),
            Err(ConfigError::Missing("email"))
        );
        assert_eq!(
            ClientConfig::new("a@b.com", "", "key").validate(),
            Err(ConfigError::Missing("password"))
        );
        assert_eq!(
            ClientConfig::new("a@b.com", "pw", "  ").validate(),
            Err(ConfigError::Missing("user_key"))
        );
        assert!(ClientConfig::new("a@b.com", "pw", "key").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = ClientConfig::new("a@b.com", "pw", "key");
        config.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "base_url", .. })
        ));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{
            "email": "user@example.com",
            "password": "secret",
            "user_key": "abc123",
            "connection": "cURL",
            "logging": true,
            "logfile": ""
        }"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.email, "user@example.com");
        assert!(config.logging);
        assert_eq!(config.logfile, None);
        assert_eq!(config.api_version, 3);
        assert_eq!(config.expiry, ExpiryDetection::default());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ClientConfig::new("a@b.com", "hunter2", "uk-8f3e21");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("uk-8f3e21"));
        assert!(printed.contains("a@b.com"));
    }
}
