//! Decoding of the JSON response envelope.
//!
//! Every response is an object with an `@attributes` member:
//!
//! ```json
//! {"@attributes": {"stat": "ok", "version": 1}, "prospect": {"id": 42}}
//! {"@attributes": {"stat": "fail", "err_code": 1}, "err": "Invalid API key or user key"}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// `stat` value of a successful response
pub const STAT_SUCCESS: &str = "ok";

/// Error code for an invalid or expired api_key
pub const ERR_INVALID_KEY: i64 = 1;

/// Error message older API versions return for an invalid or expired api_key
pub const API_EXPIRED_MSG: &str = "Invalid API key or user key";

/// Which error responses mean "the session token is no longer valid".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryDetection {
    pub error_codes: Vec<i64>,
    pub error_messages: Vec<String>,
}

impl Default for ExpiryDetection {
    fn default() -> Self {
        Self {
            error_codes: vec![ERR_INVALID_KEY],
            error_messages: vec![API_EXPIRED_MSG.to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Attributes {
    stat: String,
    #[serde(default, deserialize_with = "lenient_code")]
    err_code: Option<i64>,
}

/// err_code shows up as a number or a numeric string depending on API version
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A decoded API response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    attributes: Attributes,
    body: Value,
}

impl ResponseEnvelope {
    pub fn decode(bytes: &[u8]) -> Result<Self, ApiError> {
        let body: Value = serde_json::from_slice(bytes).map_err(|e| {
            ApiError::Decode(format!(
                "{}: {}",
                e,
                ApiError::truncate_body(&String::from_utf8_lossy(bytes))
            ))
        })?;

        let attributes = body
            .get("@attributes")
            .ok_or_else(|| ApiError::Decode("missing @attributes".to_string()))?;
        let attributes: Attributes = serde_json::from_value(attributes.clone())
            .map_err(|e| ApiError::Decode(format!("malformed @attributes: {}", e)))?;

        Ok(Self { attributes, body })
    }

    pub fn is_ok(&self) -> bool {
        self.attributes.stat == STAT_SUCCESS
    }

    pub fn stat(&self) -> &str {
        &self.attributes.stat
    }

    pub fn error_code(&self) -> Option<i64> {
        self.attributes.err_code
    }

    /// Top-level `err` message, if the API sent one
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("err").and_then(Value::as_str)
    }

    pub fn signals_expired_token(&self, detection: &ExpiryDetection) -> bool {
        if self.is_ok() {
            return false;
        }
        let by_code = self
            .error_code()
            .is_some_and(|code| detection.error_codes.contains(&code));
        let by_message = self
            .error_message()
            .is_some_and(|msg| detection.error_messages.iter().any(|m| m == msg));
        by_code || by_message
    }

    /// Object-named member of the body, e.g. `prospect`
    pub fn payload(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Convert a non-success envelope into an error
    pub fn to_error(&self) -> ApiError {
        ApiError::Remote {
            code: self.error_code(),
            message: self
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("stat={}", self.stat())),
        }
    }

    pub fn into_value(self) -> Value {
        self.body
    }
}
