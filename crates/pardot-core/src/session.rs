use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::endpoint::UrlBuilder;
use crate::envelope::ResponseEnvelope;
use crate::error::AuthError;
use crate::transport::{FormFields, Transport};

/// Response format requested on every call
pub const FORMAT_JSON: &str = "json";

/// Login credentials. Fixed for the lifetime of a [`SessionManager`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
    user_key: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str, user_key: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            user_key: user_key.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn user_key(&self) -> &str {
        &self.user_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .field("user_key", &self.user_key)
            .finish()
    }
}

/// Session token (`api_key`) issued by the login endpoint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<Token>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    fn issued(token: Token) -> Self {
        Self {
            token: Some(token),
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Minutes since the token was obtained (for display)
    pub fn age_minutes(&self) -> Option<i64> {
        self.created_at
            .map(|created| (Utc::now() - created).num_minutes().max(0))
    }
}

/// Single-file plain-text cache of the current api_key.
///
/// Advisory only: the in-memory session is authoritative.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token, if any. `created_at` is the file's mtime.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read token cache")?;
        let token = contents.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let created_at = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(Some(Session {
            token: Some(Token::new(token)),
            created_at,
        }))
    }

    /// Overwrite the cache. Writes a sibling temp file and renames it into
    /// place so a crash never leaves a partial token behind.
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create token cache directory")?;
            }
        }
        let tmp = self.temp_path();
        let written = write_private(&tmp, token.as_str())
            .and_then(|()| std::fs::rename(&tmp, &self.path).context("Failed to replace token cache"));
        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to delete token cache")?;
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

/// Create `path` readable by the owner only, then write `contents`
fn write_private(path: &Path, contents: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).context("Failed to create token cache")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write token cache")?;
    restrict_permissions(path)
}

// `mode` only applies to newly created files; a stale temp file keeps its own
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to set token cache permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Owns the credentials and the session token.
///
/// The session is only written here. Logins are serialized by a gate so that
/// several callers noticing the same expired token cause one login, not one
/// each.
pub struct SessionManager {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    urls: UrlBuilder,
    state: RwLock<Session>,
    login_gate: Mutex<()>,
    cache: Option<TokenCache>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>, urls: UrlBuilder) -> Self {
        Self {
            credentials,
            transport,
            urls,
            state: RwLock::new(Session::default()),
            login_gate: Mutex::new(()),
            cache: None,
        }
    }

    /// Attach a token cache and restore any token it holds
    pub fn with_token_cache(mut self, cache: TokenCache) -> Self {
        match cache.load() {
            Ok(Some(session)) => {
                debug!(path = %cache.path().display(), "Restored api key from token cache");
                self.state = RwLock::new(session);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable token cache"),
        }
        self.cache = Some(cache);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Fields sent with every request: `format` and `user_key`
    pub fn base_fields(&self) -> FormFields {
        FormFields::new()
            .with("format", FORMAT_JSON)
            .with("user_key", self.credentials.user_key())
    }

    /// Currently cached token. Never touches the network.
    pub async fn current_token(&self) -> Option<Token> {
        self.state.read().await.token.clone()
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.clone()
    }

    /// Log in with the stored credentials and cache the resulting token.
    ///
    /// On any failure the session is cleared. Safe to call repeatedly.
    pub async fn authenticate(&self) -> Result<Token, AuthError> {
        let _gate = self.login_gate.lock().await;
        self.login().await
    }

    /// Replace a token the API rejected.
    ///
    /// If another caller already swapped `stale` for a fresh token while we
    /// waited on the gate, that token is returned without logging in again.
    pub async fn reauthenticate(&self, stale: Option<&Token>) -> Result<Token, AuthError> {
        let _gate = self.login_gate.lock().await;
        if let Some(current) = self.current_token().await {
            if Some(&current) != stale {
                debug!("Token already refreshed by another request");
                return Ok(current);
            }
        }
        self.invalidate().await;
        self.login().await
    }

    /// Return the cached token, logging in first if there is none
    pub async fn ensure_token(&self) -> Result<Token, AuthError> {
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }
        self.reauthenticate(None).await
    }

    /// Forget the cached token, in memory and on disk
    pub async fn invalidate(&self) {
        *self.state.write().await = Session::default();
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear() {
                warn!(error = %e, "Failed to remove token cache");
            }
        }
    }

    async fn login(&self) -> Result<Token, AuthError> {
        debug!(email = %self.credentials.email(), "Trying to authenticate");

        match self.request_token().await {
            Ok(token) => {
                info!("Authentication successful");
                *self.state.write().await = Session::issued(token.clone());
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.save(&token) {
                        warn!(error = %e, path = %cache.path().display(), "Can't write api key to token cache");
                    }
                }
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                self.invalidate().await;
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<Token, AuthError> {
        let fields = self
            .base_fields()
            .with("email", self.credentials.email.as_str())
            .with("password", self.credentials.password.as_str());

        let response = self
            .transport
            .post(&self.urls.login(), &fields)
            .await
            .map_err(AuthError::Transport)?;

        let envelope = ResponseEnvelope::decode(&response.body).map_err(|e| {
            AuthError::InvalidCredentials(format!("malformed login response: {}", e))
        })?;

        if !envelope.is_ok() {
            return Err(AuthError::InvalidCredentials(envelope.to_error().to_string()));
        }

        envelope
            .payload("api_key")
            .and_then(|v| v.as_str())
            .filter(|key| !key.is_empty())
            .map(Token::new)
            .ok_or_else(|| {
                AuthError::InvalidCredentials("login response did not include an api_key".into())
            })
    }
}
