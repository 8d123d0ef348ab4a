use thiserror::Error;

/// Failures of a single API call.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Remote error (code {}): {message}", display_code(.code))]
    Remote { code: Option<i64>, message: String },
}

/// Failures of a login attempt. Both variants are fatal to the attempt.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    #[error("Authentication request failed: {0}")]
    Transport(#[source] TransportError),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn display_code(code: &Option<i64>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Remote error code carried by this error, if any.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            ApiError::Remote { code, .. } => *code,
            _ => None,
        }
    }
}
