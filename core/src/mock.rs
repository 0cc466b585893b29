//! Scripted in-memory transport for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::http::{HttpMethod, ReadyState, ReadyStateHandler, Transport};

#[derive(Default)]
struct State {
    ready_state: ReadyState,
    status: u16,
    body: String,
    opened: Option<(HttpMethod, String)>,
    headers: Vec<(String, String)>,
    sent: Option<Option<String>>,
    aborts: usize,
    reply_on_send: Option<(u16, String)>,
    fail_status_reads: bool,
    fail_open: bool,
    handler_installs: usize,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<State>>,
    handler: Arc<Mutex<Option<ReadyStateHandler>>>,
}

impl MockTransport {
    /// Complete synchronously from inside `send`.
    pub(crate) fn replying(status: u16, body: &str) -> Self {
        let mock = Self::default();
        mock.state.lock().reply_on_send = Some((status, body.to_string()));
        mock
    }

    pub(crate) fn fail_status_reads(&self) {
        self.state.lock().fail_status_reads = true;
    }

    pub(crate) fn fail_open(&self) {
        self.state.lock().fail_open = true;
    }

    pub(crate) fn complete(&self, status: u16, body: &str) {
        {
            let mut state = self.state.lock();
            state.ready_state = ReadyState::Done;
            state.status = status;
            state.body = body.to_string();
        }
        self.notify();
    }

    pub(crate) fn opened(&self) -> Option<(HttpMethod, String)> {
        self.state.lock().opened.clone()
    }

    pub(crate) fn headers(&self) -> Vec<(String, String)> {
        self.state.lock().headers.clone()
    }

    /// `None` until `send` is called, then the body it was given.
    pub(crate) fn sent(&self) -> Option<Option<String>> {
        self.state.lock().sent.clone()
    }

    pub(crate) fn aborts(&self) -> usize {
        self.state.lock().aborts
    }

    pub(crate) fn handler_installs(&self) -> usize {
        self.state.lock().handler_installs
    }

    fn notify(&self) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }
}

impl Transport for MockTransport {
    fn open(&self, method: &HttpMethod, url: &str, asynchronous: bool) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(TransportError::Unsupported("open".to_string()));
        }
        if !asynchronous {
            return Err(TransportError::Unsupported("synchronous requests".to_string()));
        }
        state.opened = Some((method.clone(), url.to_string()));
        state.ready_state = ReadyState::Opened;
        Ok(())
    }

    fn set_request_header(&self, name: &str, value: &str) -> Result<(), TransportError> {
        self.state.lock().headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn send(&self, body: Option<String>) -> Result<(), TransportError> {
        let reply = {
            let mut state = self.state.lock();
            state.sent = Some(body);
            state.reply_on_send.take()
        };
        if let Some((status, body)) = reply {
            self.complete(status, &body);
        }
        Ok(())
    }

    fn abort(&self) {
        let in_flight = {
            let mut state = self.state.lock();
            state.aborts += 1;
            let in_flight = state.sent.is_some() && !state.ready_state.is_terminal();
            if in_flight {
                state.ready_state = ReadyState::Done;
                state.status = 0;
            }
            in_flight
        };
        if in_flight {
            self.notify();
            self.state.lock().ready_state = ReadyState::Unsent;
        }
    }

    fn on_ready_state_change(&self, handler: ReadyStateHandler) {
        self.state.lock().handler_installs += 1;
        *self.handler.lock() = Some(handler);
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    fn status(&self) -> Result<u16, TransportError> {
        let state = self.state.lock();
        if state.fail_status_reads {
            return Err(TransportError::Unreadable("status"));
        }
        Ok(state.status)
    }

    fn response_text(&self) -> Result<String, TransportError> {
        Ok(self.state.lock().body.clone())
    }
}
