//! [`reqwest`]-backed implementation of [`Transport`].
//!
//! Behaves like a browser XHR: `send` starts the request on the current
//! tokio runtime and returns immediately, the ready state advances to
//! `HeadersReceived` and then `Done` as the response arrives, and `abort`
//! forces an in-flight request to `Done` with status 0 before resetting it
//! to `Unsent`. Network failures also end in `Done` with status 0.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::client::TransportFactory;
use crate::error::TransportError;
use crate::http::{HttpMethod, ReadyState, ReadyStateHandler, Transport};

#[derive(Default)]
struct Inner {
    ready_state: ReadyState,
    method: Option<reqwest::Method>,
    url: String,
    headers: Vec<(String, String)>,
    sent: bool,
    status: u16,
    body: String,
    task: Option<AbortHandle>,
    /// Bumped on every open and abort so a stale task cannot write back.
    generation: u64,
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    handler: Mutex<Option<ReadyStateHandler>>,
}

/// An XHR-like transport over a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
    shared: Arc<Shared>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            shared: Arc::default(),
        }
    }

    /// Factory handing out fresh transports that share one connection pool.
    pub fn factory() -> TransportFactory {
        let client = reqwest::Client::new();
        Arc::new(move || Arc::new(HttpTransport::with_client(client.clone())) as Arc<dyn Transport>)
    }

    fn notify(&self) {
        let handler = self.shared.handler.lock().clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }

    /// Apply `update` only if no open/abort happened since `generation`.
    fn advance(&self, generation: u64, update: impl FnOnce(&mut Inner)) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.generation != generation {
            return false;
        }
        update(&mut inner);
        true
    }

    async fn perform(self, generation: u64, request: reqwest::RequestBuilder) {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("request failed: {e}");
                self.finish(generation, 0, String::new());
                return;
            }
        };
        let status = response.status().as_u16();
        if self.advance(generation, |inner| {
            inner.status = status;
            inner.ready_state = ReadyState::HeadersReceived;
        }) {
            self.notify();
        }
        match response.text().await {
            Ok(body) => self.finish(generation, status, body),
            Err(e) => {
                tracing::debug!("failed to read response body: {e}");
                self.finish(generation, 0, String::new());
            }
        }
    }

    fn finish(&self, generation: u64, status: u16, body: String) {
        let finished = self.advance(generation, |inner| {
            inner.status = status;
            inner.body = body;
            inner.ready_state = ReadyState::Done;
            inner.task = None;
        });
        if finished {
            self.notify();
        }
    }
}

impl Transport for HttpTransport {
    fn open(&self, method: &HttpMethod, url: &str, asynchronous: bool) -> Result<(), TransportError> {
        if !asynchronous {
            return Err(TransportError::Unsupported("synchronous requests".to_string()));
        }
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|_| TransportError::Unsupported(format!("method {method}")))?;
        {
            let mut inner = self.shared.inner.lock();
            if inner.sent && !inner.ready_state.is_terminal() {
                return Err(TransportError::InvalidState {
                    expected: ReadyState::Done,
                    actual: inner.ready_state,
                });
            }
            let generation = inner.generation + 1;
            *inner = Inner {
                method: Some(method),
                url: url.to_string(),
                ready_state: ReadyState::Opened,
                generation,
                ..Inner::default()
            };
        }
        self.notify();
        Ok(())
    }

    fn set_request_header(&self, name: &str, value: &str) -> Result<(), TransportError> {
        let mut inner = self.shared.inner.lock();
        if inner.ready_state != ReadyState::Opened || inner.sent {
            return Err(TransportError::InvalidState {
                expected: ReadyState::Opened,
                actual: inner.ready_state,
            });
        }
        inner.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn send(&self, body: Option<String>) -> Result<(), TransportError> {
        let runtime = Handle::try_current()
            .map_err(|_| TransportError::Unsupported("send outside a tokio runtime".to_string()))?;
        let mut inner = self.shared.inner.lock();
        let method = match (&inner.method, inner.ready_state, inner.sent) {
            (Some(method), ReadyState::Opened, false) => method.clone(),
            _ => {
                return Err(TransportError::InvalidState {
                    expected: ReadyState::Opened,
                    actual: inner.ready_state,
                })
            }
        };
        let mut request = self.client.request(method, inner.url.as_str());
        for (name, value) in &inner.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        inner.sent = true;
        let task = runtime.spawn(self.clone().perform(inner.generation, request));
        inner.task = Some(task.abort_handle());
        Ok(())
    }

    fn abort(&self) {
        let generation = {
            let mut inner = self.shared.inner.lock();
            if !inner.sent || inner.ready_state.is_terminal() {
                if !inner.ready_state.is_terminal() {
                    inner.ready_state = ReadyState::Unsent;
                }
                return;
            }
            if let Some(task) = inner.task.take() {
                task.abort();
            }
            inner.generation += 1;
            inner.status = 0;
            inner.body.clear();
            inner.ready_state = ReadyState::Done;
            inner.generation
        };
        self.notify();
        self.advance(generation, |inner| {
            inner.ready_state = ReadyState::Unsent;
            inner.sent = false;
        });
    }

    fn on_ready_state_change(&self, handler: ReadyStateHandler) {
        *self.shared.handler.lock() = Some(handler);
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.inner.lock().ready_state
    }

    fn status(&self) -> Result<u16, TransportError> {
        Ok(self.shared.inner.lock().status)
    }

    fn response_text(&self) -> Result<String, TransportError> {
        Ok(self.shared.inner.lock().body.clone())
    }
}
