//! Transport boundary for the host-does-IO pattern.
//!
//! # Design
//! The core never performs network I/O itself. It drives a host-provided
//! object shaped like an XHR: `open`, `set_request_header`, `send`, `abort`
//! and a ready-state notification. Whatever the host wires behind that
//! surface (a browser bridge, a blocking client on a thread, the bundled
//! `HttpTransport`) is invisible to the executor.
//!
//! Handlers receive the transport as `&dyn Transport` when they fire, so a
//! transport never has to hold a reference to itself.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    /// Any other token the transport is willing to send.
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Custom(method) => method.as_str(),
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Custom(method.to_string()),
        }
    }
}

impl From<String> for HttpMethod {
    fn from(method: String) -> Self {
        HttpMethod::from(method.as_str())
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// XHR ready states. Only `Done` (4) is treated as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        self == ReadyState::Done
    }
}

/// Callback fired by a transport whenever its ready state changes.
pub type ReadyStateHandler = Arc<dyn Fn(&dyn Transport) + Send + Sync>;

/// The XHR-like surface the executor drives.
///
/// A transport serves one request at a time. `abort` must be idempotent:
/// calling it on an idle or finished transport is a no-op. The field readers
/// are fallible because some hosts refuse to expose them in certain states.
pub trait Transport: Send + Sync {
    fn open(&self, method: &HttpMethod, url: &str, asynchronous: bool) -> Result<(), TransportError>;

    fn set_request_header(&self, name: &str, value: &str) -> Result<(), TransportError>;

    fn send(&self, body: Option<String>) -> Result<(), TransportError>;

    fn abort(&self);

    /// Replace the ready-state handler. Only one handler is kept.
    fn on_ready_state_change(&self, handler: ReadyStateHandler);

    fn ready_state(&self) -> ReadyState;

    fn status(&self) -> Result<u16, TransportError>;

    fn response_text(&self) -> Result<String, TransportError>;
}

/// Read-only snapshot of a transport after it reached (or was forced into)
/// its terminal state.
///
/// A `status` of 0 means no response was ever received: the request was
/// aborted, timed out, failed to connect, or the host could not report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResult {
    pub status: u16,
    pub ready_state: ReadyState,
    pub body: String,
}

impl TransportResult {
    /// Snapshot every observable field of `transport`.
    ///
    /// Returns `Err` with a partial snapshot when a field cannot be read.
    /// An unreadable status is recorded as 0 and an unreadable body as empty.
    pub fn capture(transport: &dyn Transport) -> Result<Self, Self> {
        let ready_state = transport.ready_state();
        let status = transport.status();
        let body = transport.response_text();
        match (status, body) {
            (Ok(status), Ok(body)) => Ok(Self {
                status,
                ready_state,
                body,
            }),
            (status, body) => Err(Self {
                status: status.unwrap_or(0),
                ready_state,
                body: body.unwrap_or_default(),
            }),
        }
    }
}
