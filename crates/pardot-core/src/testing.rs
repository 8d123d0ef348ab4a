//! In-memory transport for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::endpoint::LOGIN_OBJECT;
use crate::error::TransportError;
use crate::transport::{FormFields, RawResponse, Transport};

type Handler = dyn Fn(&str, &FormFields) -> Result<RawResponse, TransportError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub fields: FormFields,
}

impl RecordedRequest {
    pub fn is_login(&self) -> bool {
        self.url.contains(&format!("/{}/version/", LOGIN_OBJECT))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.fields.get("api_key").and_then(|v| v.as_text())
    }
}

/// Answers each POST through a handler and records what was sent.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&str, &FormFields) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Reply with each response in turn; extra calls get a connection error
    pub fn sequence(responses: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        let queue = Mutex::new(responses.into_iter());
        Self::new(move |_, _| {
            queue
                .lock()
                .unwrap()
                .next()
                .unwrap_or_else(|| Err(TransportError::Connection("no scripted response".into())))
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn login_count(&self) -> usize {
        self.requests().iter().filter(|r| r.is_login()).count()
    }

    pub fn data_requests(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| !r.is_login()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, fields: &FormFields) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            fields: fields.clone(),
        });
        // let concurrent callers interleave
        tokio::task::yield_now().await;
        (self.handler)(url, fields)
    }
}

pub fn json_response(body: Value) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(200, body.to_string()))
}

pub fn login_ok(token: &str) -> Result<RawResponse, TransportError> {
    json_response(json!({"@attributes": {"stat": "ok", "version": 1}, "api_key": token}))
}

pub fn login_rejected() -> Result<RawResponse, TransportError> {
    json_response(json!({
        "@attributes": {"stat": "fail", "err_code": 15},
        "err": "Login failed"
    }))
}

pub fn data_ok(object: &str, payload: Value) -> Result<RawResponse, TransportError> {
    let mut body = json!({"@attributes": {"stat": "ok", "version": 1}});
    body[object] = payload;
    json_response(body)
}

pub fn expired_key() -> Result<RawResponse, TransportError> {
    json_response(json!({"@attributes": {"stat": "error", "err_code": 1}}))
}

pub fn remote_error(code: i64, message: &str) -> Result<RawResponse, TransportError> {
    json_response(json!({"@attributes": {"stat": "fail", "err_code": code}, "err": message}))
}
