//! HTTP transport adapter.
//!
//! Every API call is a form-encoded POST. The [`Transport`] trait is the seam
//! the session manager and client talk to; [`HttpTransport`] is the reqwest
//! implementation used outside of tests.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Field names whose values never appear in logs
const REDACTED_FIELDS: [&str; 2] = ["password", "api_key"];

/// A single form field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FieldValue {
    /// Wire representation. Booleans become the literal strings `true`/`false`.
    pub fn as_form_value(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Int(i) => Cow::Owned(i.to_string()),
            FieldValue::Bool(true) => Cow::Borrowed("true"),
            FieldValue::Bool(false) => Cow::Borrowed("false"),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a loosely-typed CLI or config value: `true`/`false` become
    /// booleans, integers become `Int`, anything else stays text.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(FieldValue::Int)
                .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

/// Outgoing request fields, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields(BTreeMap<String, FieldValue>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into `self`. Values from `other` win on collision.
    pub fn merge(&mut self, other: FormFields) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name/value pairs in wire form
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.as_form_value().into_owned()))
            .collect()
    }

    /// `application/x-www-form-urlencoded` body
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| (k.as_str(), v.as_form_value())))
            .finish()
    }

    /// Encoded form with secrets masked, for logging
    pub fn redacted(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| {
                if REDACTED_FIELDS.contains(&k.as_str()) {
                    (k.as_str(), Cow::Borrowed("***"))
                } else {
                    (k.as_str(), v.as_form_value())
                }
            }))
            .finish()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Raw status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends form-encoded POST requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, fields: &FormFields) -> Result<RawResponse, TransportError>;
}

/// Transport implementation selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    #[default]
    #[serde(rename = "http", alias = "cURL", alias = "curl")]
    Http,
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client, sharing its connection pool
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, fields: &FormFields) -> Result<RawResponse, TransportError> {
        debug!(url = url, "Making post request");
        debug!(fields = %fields.redacted(), "Posting variables");

        let response = self
            .client
            .post(url)
            .form(&fields.to_pairs())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status, "Response code received");
        debug!(body = %String::from_utf8_lossy(&body), "Response body received");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_fields_encode_as_literal_strings() {
        let fields = FormFields::new()
            .with("assigned", true)
            .with("is_archived", false)
            .with("limit", 4);

        let encoded = fields.encode();
        let decoded: Vec<(String, String)> = url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();

        assert!(decoded.contains(&("assigned".to_string(), "true".to_string())));
        assert!(decoded.contains(&("is_archived".to_string(), "false".to_string())));
        assert!(decoded.contains(&("limit".to_string(), "4".to_string())));
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let fields = FormFields::new().with("email", "a+b@example.com").with("note", "x y&z");
        assert_eq!(fields.encode(), "email=a%2Bb%40example.com&note=x+y%26z");
    }

    #[test]
    fn test_merge_prefers_incoming_values() {
        let mut base = FormFields::new().with("format", "json").with("limit", 10);
        base.merge(FormFields::new().with("limit", 4).with("offset", 8));

        assert_eq!(base.get("format"), Some(&FieldValue::from("json")));
        assert_eq!(base.get("limit"), Some(&FieldValue::Int(4)));
        assert_eq!(base.get("offset"), Some(&FieldValue::Int(8)));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let fields = FormFields::new()
            .with("api_key", "secret-token")
            .with("password", "hunter2")
            .with("email", "user@example.com");

        assert_eq!(
            fields.redacted(),
            "api_key=***&email=user%40example.com&password=***"
        );
    }

    #[test]
    fn test_field_value_infer() {
        assert_eq!(FieldValue::infer("true"), FieldValue::Bool(true));
        assert_eq!(FieldValue::infer("false"), FieldValue::Bool(false));
        assert_eq!(FieldValue::infer("100"), FieldValue::Int(100));
        assert_eq!(FieldValue::infer("2024-01-01"), FieldValue::from("2024-01-01"));
    }

    #[test]
    fn test_connection_accepts_legacy_name() {
        let conn: Connection = serde_json::from_str("\"cURL\"").unwrap();
        assert_eq!(conn, Connection::Http);
    }
}
