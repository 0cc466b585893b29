//! Error types for the request layer.
//!
//! # Design
//! `ConfigError` is returned synchronously from `execute` and friends, before
//! any transport work is scheduled; it never shows up as a future rejection.
//! `RequestError` is the rejected branch of every returned future. The
//! variants that stem from the transport carry the `TransportResult` so the
//! caller can inspect status and body of the failed request.

use std::time::Duration;

use thiserror::Error;

use crate::http::{ReadyState, TransportResult};

/// Invalid arguments, rejected before anything asynchronous happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("settings are required")]
    MissingSettings,

    #[error("settings must be a url or an object: {0}")]
    InvalidSettings(String),

    #[error("settings.url is required")]
    MissingUrl,

    #[error("no transport supplied and no transport factory configured")]
    NoTransport,

    #[error("validator type {0} unsupported")]
    UnsupportedValidator(String),
}

/// Failures raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is {actual:?}, operation requires {expected:?}")]
    InvalidState {
        expected: ReadyState,
        actual: ReadyState,
    },

    #[error("transport does not support {0}")]
    Unsupported(String),

    #[error("failed to read {0} from transport")]
    Unreadable(&'static str),

    #[error("{0}")]
    Host(String),
}

/// Why a request future was rejected.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport finished without a response (status 0): aborted,
    /// refused, or unreadable.
    #[error("request failed without a response (status {})", .0.status)]
    Transport(TransportResult),

    /// A status filter did not accept the response.
    #[error("status {} rejected", .0.status)]
    Status(TransportResult),

    /// The timeout elapsed first; `result` is the snapshot taken right after
    /// the transport was asked to abort.
    #[error("request timed out after {after:?}")]
    Timeout {
        after: Duration,
        result: TransportResult,
    },

    /// Building or sending the request failed inside the transport.
    #[error("failed to issue request: {0}")]
    Setup(#[from] TransportError),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The transport dropped its handler without ever reaching a terminal state.
    #[error("transport was dropped before completing")]
    Abandoned,
}

impl RequestError {
    /// The transport snapshot carried by this error, if any.
    pub fn result(&self) -> Option<&TransportResult> {
        match self {
            RequestError::Transport(result)
            | RequestError::Status(result)
            | RequestError::Timeout { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }
}
