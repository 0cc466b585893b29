//! Future-based HTTP request layer over a host-provided transport.
//!
//! # Overview
//! The core drives an XHR-like [`Transport`] the host supplies (or the
//! bundled [`HttpTransport`]) and turns its ready-state notifications into a
//! single-settlement future, optionally raced against a timeout. Status
//! filters and the JSON codec reclassify and decode the raw result.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use ajax_core::{decode_json, Client, Defaults, RequestSettings};
//!
//! let client = Client::new(Defaults::default());
//! let result = client
//!     .execute(RequestSettings::new("http://localhost:3000/dataset/sample01.json"))?
//!     .await?;
//! let people: serde_json::Value = decode_json(&ajax_core::success().check(result)?)?;
//! # let _ = people;
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Validation errors (`ConfigError`) are returned synchronously and never
//!   enter the future; everything after validation is `RequestError`.
//! - `Defaults` are injected per `Client`. The process-wide instance in
//!   [`config`] backs [`Client::global`] and the free functions below.
//! - The timeout is a `select` between completion and a timer; on expiry the
//!   transport is aborted and the request rejects with `RequestError::Timeout`.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod query;
#[cfg(feature = "http")]
pub mod reqwest_transport;
pub mod timeout;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

pub use client::{Client, ResponseFuture, TransportFactory};
pub use codec::{decode_json, encode_json};
pub use config::Defaults;
pub use error::{ConfigError, RequestError, TransportError};
pub use filter::{success, StatusFilter, Validator};
pub use http::{HttpMethod, ReadyState, ReadyStateHandler, Transport, TransportResult};
pub use query::serialize;
#[cfg(feature = "http")]
pub use reqwest_transport::HttpTransport;
pub use types::{Body, Headers, RequestInput, RequestSettings};

/// [`Client::execute`] on the process-wide defaults.
pub fn execute(input: impl Into<RequestInput>) -> Result<ResponseFuture, ConfigError> {
    Client::global().execute(input)
}

/// [`Client::get_json`] on the process-wide defaults.
pub fn get_json<T>(url: &str) -> Result<BoxFuture<'static, Result<T, RequestError>>, ConfigError>
where
    T: DeserializeOwned + Send + 'static,
{
    Client::global().get_json(url)
}
