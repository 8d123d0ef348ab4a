//! Configuration loading for the command-line client.
//!
//! Settings come from `~/.config/pardot/config.json` (if present), then
//! `PARDOT_*` environment variables, which may also be set in a `.env` file.
//! The api_key cache defaults to `~/.cache/pardot/api_key`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use pardot_core::ClientConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pardot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token cache file name in the cache directory
const TOKEN_CACHE_FILE: &str = "api_key";

pub fn load() -> Result<ClientConfig> {
    let mut config = match config_path() {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        _ => ClientConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay environment settings onto `config`.
///
/// `PARDOT_TOKEN_CACHE` set to an empty string or `off` disables the cache;
/// unset, the default cache path is used unless the file already chose one.
pub fn apply_env<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(email) = lookup("PARDOT_EMAIL") {
        config.email = email;
    }
    if let Some(password) = lookup("PARDOT_PASSWORD") {
        config.password = password;
    }
    if let Some(user_key) = lookup("PARDOT_USER_KEY") {
        config.user_key = user_key;
    }
    if let Some(debug) = lookup("PARDOT_DEBUG") {
        config.debug = parse_flag(&debug);
    }
    if let Some(logging) = lookup("PARDOT_LOGGING") {
        config.logging = parse_flag(&logging);
    }
    if let Some(logfile) = lookup("PARDOT_LOGFILE") {
        config.logfile = Some(logfile)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
    }
    if let Some(base_url) = lookup("PARDOT_BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(timeout) = lookup("PARDOT_TIMEOUT_SECS") {
        config.request_timeout_secs = timeout
            .trim()
            .parse()
            .with_context(|| format!("PARDOT_TIMEOUT_SECS is not a number: {}", timeout))?;
    }

    match lookup("PARDOT_TOKEN_CACHE") {
        Some(v) if v.trim().is_empty() || v.eq_ignore_ascii_case("off") => {
            config.token_cache = None;
        }
        Some(v) => config.token_cache = Some(PathBuf::from(v)),
        None => {
            if config.token_cache.is_none() {
                config.token_cache = default_token_cache();
            }
        }
    }

    Ok(())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

fn default_token_cache() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_NAME).join(TOKEN_CACHE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ClientConfig::new("file@example.com", "filepw", "filekey");
        apply_env(
            &mut config,
            lookup_from(&[
                ("PARDOT_EMAIL", "env@example.com"),
                ("PARDOT_DEBUG", "true"),
                ("PARDOT_LOGGING", "0"),
                ("PARDOT_TIMEOUT_SECS", "10"),
            ]),
        )
        .unwrap();

        assert_eq!(config.email, "env@example.com");
        assert_eq!(config.password, "filepw");
        assert!(config.debug);
        assert!(!config.logging);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_empty_logfile_means_system_log() {
        let mut config = ClientConfig::default();
        apply_env(&mut config, lookup_from(&[("PARDOT_LOGFILE", "")])).unwrap();
        assert_eq!(config.logfile, None);
    }

    #[test]
    fn test_token_cache_can_be_disabled() {
        let mut config = ClientConfig::default();
        apply_env(&mut config, lookup_from(&[("PARDOT_TOKEN_CACHE", "off")])).unwrap();
        assert_eq!(config.token_cache, None);

        apply_env(&mut config, lookup_from(&[("PARDOT_TOKEN_CACHE", "/tmp/pardot_api_key")]))
            .unwrap();
        assert_eq!(config.token_cache, Some(PathBuf::from("/tmp/pardot_api_key")));
    }

    #[test]
    fn test_file_token_cache_is_kept() {
        let mut config = ClientConfig::default();
        config.token_cache = Some(PathBuf::from("/var/cache/pardot"));
        apply_env(&mut config, lookup_from(&[])).unwrap();
        assert_eq!(config.token_cache, Some(PathBuf::from("/var/cache/pardot")));
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let mut config = ClientConfig::default();
        assert!(apply_env(&mut config, lookup_from(&[("PARDOT_TIMEOUT_SECS", "soon")])).is_err());
    }
}
