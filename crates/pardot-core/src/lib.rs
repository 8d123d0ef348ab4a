//! Core library for pardot - a client for the Pardot REST/JSON API.
//!
//! This crate provides:
//! - `PardotClient`: object operations and queries with transparent
//!   re-authentication when the api_key expires
//! - `SessionManager`: credential login, token state and the optional
//!   on-disk token cache
//! - `Transport`: the HTTP seam, with a reqwest implementation
//!
//! ```no_run
//! use pardot_core::{ClientConfig, FormFields, ObjectType, PardotClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::new("user@example.com", "password", "user-key");
//! let client = PardotClient::from_config(&config)?;
//! client.connect().await?;
//!
//! let result = client
//!     .query(ObjectType::Prospect, Some(FormFields::new().with("limit", 4)))
//!     .await;
//! println!("{:?}", result.payload(ObjectType::Prospect));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod objects;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{OperationResult, PardotClient};
pub use config::ClientConfig;
pub use endpoint::UrlBuilder;
pub use envelope::{ExpiryDetection, ResponseEnvelope};
pub use error::{ApiError, AuthError, ConfigError, TransportError};
pub use objects::{ObjectType, Operation};
pub use session::{Credentials, Session, SessionManager, Token, TokenCache};
pub use transport::{Connection, FieldValue, FormFields, HttpTransport, RawResponse, Transport};
