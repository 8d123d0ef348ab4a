//! Request orchestration for the Pardot API.
//!
//! [`PardotClient`] builds object URLs, attaches session fields, and runs
//! every call through [`PardotClient::execute`], which re-authenticates and
//! retries exactly once when the API reports an expired api_key.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::endpoint::UrlBuilder;
use crate::envelope::{ExpiryDetection, ResponseEnvelope};
use crate::error::{ApiError, AuthError, ConfigError};
use crate::objects::{ObjectType, Operation};
use crate::session::{SessionManager, Token, TokenCache};
use crate::transport::{Connection, FormFields, HttpTransport, Transport};

/// Outcome of a shaped operation.
///
/// `error_message` is only set for local validation failures that never
/// reached the network. `error_code` carries the remote `err_code` of the
/// final attempt, when there was one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub response: Option<Value>,
    pub error_message: Option<String>,
    pub error_code: Option<i64>,
}

impl OperationResult {
    /// Object-named member of the response, e.g. `prospect`
    pub fn payload(&self, object: ObjectType) -> Option<&Value> {
        self.response.as_ref().and_then(|r| r.get(object.as_str()))
    }
}

impl From<Result<Value, ApiError>> for OperationResult {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(response) => OperationResult {
                success: true,
                response: Some(response),
                ..Default::default()
            },
            Err(ApiError::Validation(msg)) => OperationResult {
                error_message: Some(msg),
                ..Default::default()
            },
            Err(e) => OperationResult {
                error_code: e.remote_code(),
                ..Default::default()
            },
        }
    }
}

/// Client for the Pardot REST/JSON API.
///
/// Construct once and share (it is `Send + Sync`); there is no global
/// instance.
pub struct PardotClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    urls: UrlBuilder,
    expiry: ExpiryDetection,
}

impl PardotClient {
    /// Build a client over the given transport. Fails if the configuration
    /// is incomplete, before any request is made.
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;

        let urls = UrlBuilder::new(&config.base_url, config.api_version);
        let mut session = SessionManager::new(config.credentials(), transport.clone(), urls.clone());
        if let Some(path) = &config.token_cache {
            session = session.with_token_cache(TokenCache::new(path));
        }

        Ok(Self {
            transport,
            session: Arc::new(session),
            urls,
            expiry: config.expiry.clone(),
        })
    }

    /// Build a client with the transport selected by `config.connection`
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport: Arc<dyn Transport> = match config.connection {
            Connection::Http => Arc::new(HttpTransport::new(config.request_timeout()).map_err(
                |e| ConfigError::Invalid {
                    field: "connection",
                    reason: e.to_string(),
                },
            )?),
        };
        Self::new(config, transport)
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Shared handle to the session manager
    pub fn session_handle(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    /// Make sure a token is available, logging in if needed
    pub async fn connect(&self) -> Result<Token, AuthError> {
        self.session.ensure_token().await
    }

    /// `<object>/version/N/do/<operation>/id/<id>/`
    pub async fn operation_by_id(
        &self,
        object: ObjectType,
        operation: Operation,
        id: &str,
        extra: Option<FormFields>,
    ) -> OperationResult {
        if id.trim().is_empty() {
            return Self::invalid_input("operation_by_id(): id is required");
        }
        let url = self
            .urls
            .build(object.as_str(), &[("do", operation.as_str()), ("id", id)]);
        self.run(url, extra).await
    }

    /// `<object>/version/N/do/<operation>/<field>/<value>/`
    pub async fn operation_by_field(
        &self,
        object: ObjectType,
        operation: Operation,
        field: &str,
        value: &str,
        extra: Option<FormFields>,
    ) -> OperationResult {
        if field.trim().is_empty() || value.trim().is_empty() {
            return Self::invalid_input("operation_by_field(): field and value are required");
        }
        let url = self
            .urls
            .build(object.as_str(), &[("do", operation.as_str()), (field, value)]);
        self.run(url, extra).await
    }

    /// `<object>/version/N/do/query/`. Filters typically carry `limit`,
    /// `offset` and the like; they are passed through untouched.
    pub async fn query(&self, object: ObjectType, filters: Option<FormFields>) -> OperationResult {
        let url = self
            .urls
            .build(object.as_str(), &[("do", Operation::Query.as_str())]);
        self.run(url, filters).await
    }

    /// Generic request against an already-built URL
    pub async fn request(&self, url: &str, fields: FormFields) -> OperationResult {
        self.execute(url, fields).await.into()
    }

    /// Session fields plus caller extras. Caller values win on collision.
    pub async fn request_fields(&self, extra: Option<FormFields>) -> FormFields {
        let token = self.session.current_token().await;
        self.fields_with(token.as_ref(), extra)
    }

    /// Send a request, re-authenticating and retrying once if the api_key
    /// has expired.
    pub async fn execute(&self, url: &str, fields: FormFields) -> Result<Value, ApiError> {
        let token = self.session.current_token().await;
        self.execute_as(url, fields, token).await
    }

    /// `session_token` is the session's token when `fields` were built. It,
    /// not whatever `api_key` the fields carry, is what a re-login replaces.
    async fn execute_as(
        &self,
        url: &str,
        mut fields: FormFields,
        session_token: Option<Token>,
    ) -> Result<Value, ApiError> {
        let envelope = self.send(url, &fields).await?;

        if envelope.is_ok() {
            return Ok(envelope.into_value());
        }

        if !envelope.signals_expired_token(&self.expiry) {
            let err = envelope.to_error();
            warn!(url = url, error = %err, "Request failed");
            return Err(err);
        }

        debug!(url = url, "API key expired, authenticating again");
        let token = self
            .session
            .reauthenticate(session_token.as_ref())
            .await
            .inspect_err(|e| warn!(error = %e, "Re-authentication failed"))?;

        fields.insert("api_key", token.as_str());

        let envelope = self.send(url, &fields).await?;
        if envelope.is_ok() {
            Ok(envelope.into_value())
        } else {
            let err = envelope.to_error();
            warn!(url = url, error = %err, "Request failed after re-authentication");
            Err(err)
        }
    }

    fn fields_with(&self, token: Option<&Token>, extra: Option<FormFields>) -> FormFields {
        let mut fields = self.session.base_fields();
        if let Some(token) = token {
            fields.insert("api_key", token.as_str());
        }
        if let Some(extra) = extra {
            fields.merge(extra);
        }
        fields
    }

    async fn run(&self, url: String, extra: Option<FormFields>) -> OperationResult {
        let token = self.session.current_token().await;
        let fields = self.fields_with(token.as_ref(), extra);
        self.execute_as(&url, fields, token).await.into()
    }

    async fn send(&self, url: &str, fields: &FormFields) -> Result<ResponseEnvelope, ApiError> {
        let response = self
            .transport
            .post(url, fields)
            .await
            .inspect_err(|e| warn!(url = url, error = %e, "Request could not be sent"))?;

        ResponseEnvelope::decode(&response.body)
            .inspect_err(|e| warn!(url = url, status = response.status, error = %e, "Undecodable response"))
    }

    fn invalid_input(message: &str) -> OperationResult {
        warn!("{}", message);
        OperationResult::from(Err::<Value, _>(ApiError::Validation(message.to_string())))
    }
}
