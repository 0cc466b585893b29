//! Request executor.
//!
//! # Design
//! `execute` validates its input synchronously and returns a lazy future.
//! Nothing touches the transport until that future is polled: the transport
//! is created (or borrowed from the settings), a ready-state handler is
//! attached, then `open`, headers and `send` run in that order. Any failure
//! from here on is a `RequestError`, never a `ConfigError`.
//!
//! The handler settles a single-assignment `Settlement` once the transport
//! reports `ReadyState::Done`. Later notifications (an abort after a timeout,
//! a misbehaving host firing twice) find it already settled and do nothing.

use std::sync::Arc;
#[cfg(feature = "http")]
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::codec::{decode_json, encode_json};
use crate::config::{self, Defaults};
use crate::error::{ConfigError, RequestError};
use crate::filter;
use crate::http::{HttpMethod, Transport, TransportResult};
use crate::timeout;
use crate::types::{Body, Headers, RequestInput, RequestSettings};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";
const CACHE_BUST_PARAM: &str = "_";

/// Future returned by `Client::execute`.
pub type ResponseFuture = BoxFuture<'static, Result<TransportResult, RequestError>>;

/// Creates a fresh transport for requests that do not bring their own.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn Transport> + Send + Sync>;

type Outcome = Result<TransportResult, TransportResult>;

/// Issues requests over a transport, using `Defaults` for anything the
/// per-call settings leave out.
#[derive(Clone)]
pub struct Client {
    defaults: Arc<ArcSwap<Defaults>>,
    factory: Option<TransportFactory>,
}

impl Client {
    /// Client with its own defaults and the bundled `HttpTransport`.
    #[cfg(feature = "http")]
    pub fn new(defaults: Defaults) -> Self {
        Self::with_factory(defaults, Some(crate::reqwest_transport::HttpTransport::factory()))
    }

    /// Client with its own defaults. Without a factory, every request must
    /// supply `RequestSettings::transport`.
    pub fn with_factory(defaults: Defaults, factory: Option<TransportFactory>) -> Self {
        Self {
            defaults: Arc::new(ArcSwap::from_pointee(defaults)),
            factory,
        }
    }

    /// Client reading the process-wide defaults at each request.
    pub fn global() -> Self {
        Self {
            defaults: config::global(),
            factory: default_factory(),
        }
    }

    pub fn defaults(&self) -> Arc<Defaults> {
        self.defaults.load_full()
    }

    pub fn set_defaults(&self, defaults: Defaults) {
        self.defaults.store(Arc::new(defaults));
    }

    pub fn update_defaults(&self, update: impl Fn(&mut Defaults)) {
        self.defaults.rcu(|current| {
            let mut next = Defaults::clone(current);
            update(&mut next);
            next
        });
    }

    /// Issue a request. Resolves with any response that has a non-zero
    /// status, whatever that status is; rejects when the transport ends
    /// without one or the timeout elapses first.
    pub fn execute(&self, input: impl Into<RequestInput>) -> Result<ResponseFuture, ConfigError> {
        let mut settings = input.into().resolve()?;
        let source = match (settings.transport.take(), &self.factory) {
            (Some(transport), _) => TransportSource::Supplied(transport),
            (None, Some(factory)) => TransportSource::Factory(Arc::clone(factory)),
            (None, None) => return Err(ConfigError::NoTransport),
        };
        let defaults = self.defaults.load_full();

        Ok(async move {
            let transport = match source {
                TransportSource::Supplied(transport) => transport,
                TransportSource::Factory(factory) => factory(),
            };
            let prepared = Prepared::new(settings, &defaults)?;
            prepared.run(transport, defaults).await
        }
        .boxed())
    }

    /// Fetch `url` with GET, keep only successful statuses, decode the body.
    pub fn get_json<T>(&self, url: &str) -> Result<BoxFuture<'static, Result<T, RequestError>>, ConfigError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let response = self.execute(RequestSettings::new(url).with_method(HttpMethod::Get))?;
        Ok(async move {
            let result = filter::success().check(response.await?)?;
            decode_json(&result)
        }
        .boxed())
    }
}

enum TransportSource {
    Supplied(Arc<dyn Transport>),
    Factory(TransportFactory),
}

#[cfg(feature = "http")]
static DEFAULT_FACTORY: LazyLock<TransportFactory> =
    LazyLock::new(crate::reqwest_transport::HttpTransport::factory);

#[cfg(feature = "http")]
fn default_factory() -> Option<TransportFactory> {
    Some(Arc::clone(&DEFAULT_FACTORY))
}

#[cfg(not(feature = "http"))]
fn default_factory() -> Option<TransportFactory> {
    None
}

/// Effective request values after folding settings over defaults.
#[derive(Debug)]
struct Prepared {
    method: HttpMethod,
    /// URL with base applied, without the cache-bust parameter.
    url: String,
    cache_bust: bool,
    headers: Headers,
    body: Option<String>,
    timeout: Duration,
}

impl Prepared {
    fn new(settings: RequestSettings, defaults: &Defaults) -> Result<Self, RequestError> {
        let method = settings.method.unwrap_or_else(|| defaults.method.clone());
        let base = settings.base.as_deref().unwrap_or(&defaults.base);
        let url = format!("{base}{}", settings.url);
        let mut headers = settings.headers.unwrap_or_else(|| defaults.headers.clone());
        let timeout = settings
            .timeout
            .unwrap_or_else(|| Duration::from_millis(defaults.timeout_ms));

        let body = match settings.body {
            None | Some(Body::Json(Value::Null)) => None,
            Some(Body::Text(text)) => Some(text),
            Some(Body::Json(Value::String(text))) => Some(text),
            Some(Body::Json(value @ (Value::Array(_) | Value::Object(_)))) => {
                if !headers.contains(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, APPLICATION_JSON);
                }
                Some(encode_json(&value)?)
            }
            Some(Body::Json(primitive)) => Some(primitive.to_string()),
        };

        Ok(Self {
            method,
            url,
            cache_bust: settings.cache_bust.unwrap_or(defaults.cache_bust),
            headers,
            body,
            timeout,
        })
    }

    fn target(&self) -> String {
        if !self.cache_bust {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!("{}{separator}{CACHE_BUST_PARAM}={now}", self.url)
    }

    async fn run(self, transport: Arc<dyn Transport>, defaults: Arc<Defaults>) -> Result<TransportResult, RequestError> {
        let (tx, rx) = oneshot::channel();
        let settlement = Arc::new(Settlement::new(tx));
        {
            let settlement = Arc::clone(&settlement);
            let defaults = Arc::clone(&defaults);
            let label = format!("{} {}", self.method, self.url);
            transport.on_ready_state_change(Arc::new(move |t: &dyn Transport| {
                if !t.ready_state().is_terminal() {
                    return;
                }
                let outcome = match TransportResult::capture(t) {
                    Ok(result) if result.status != 0 => Ok(result),
                    Ok(result) | Err(result) => Err(result),
                };
                let status = match &outcome {
                    Ok(result) | Err(result) => result.status,
                };
                log(&defaults, format_args!("{label} => {status}"));
                settlement.settle(outcome);
            }));
        }

        let target = self.target();
        let started = transport
            .open(&self.method, &target, true)
            .and_then(|()| {
                self.headers
                    .iter()
                    .try_for_each(|(name, value)| transport.set_request_header(name, value))
            })
            .and_then(|()| transport.send(self.body));
        if let Err(err) = started {
            detach(&*transport);
            return Err(err.into());
        }

        let completion = async move {
            match rx.await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(result)) => Err(RequestError::Transport(result)),
                Err(_) => Err(RequestError::Abandoned),
            }
        };
        let method = self.method;
        let url = self.url;
        let outcome = timeout::race(completion, Some(self.timeout), || {
            log(&defaults, format_args!("request delay reached in {method} {url}"));
            transport.abort();
            TransportResult::capture(&*transport).unwrap_or_else(|partial| partial)
        })
        .await;
        detach(&*transport);
        outcome
    }
}

/// Drop the request's handler so a caller-owned transport stops holding it.
fn detach(transport: &dyn Transport) {
    transport.on_ready_state_change(Arc::new(|_: &dyn Transport| {}));
}

/// Single-assignment slot behind every request future.
struct Settlement {
    state: Mutex<SettleState>,
}

enum SettleState {
    Pending(oneshot::Sender<Outcome>),
    Resolved,
    Rejected,
}

impl Settlement {
    fn new(tx: oneshot::Sender<Outcome>) -> Self {
        Self {
            state: Mutex::new(SettleState::Pending(tx)),
        }
    }

    /// First call wins; every later call is a no-op.
    fn settle(&self, outcome: Outcome) {
        let mut state = self.state.lock();
        if !matches!(*state, SettleState::Pending(_)) {
            return;
        }
        let next = if outcome.is_ok() {
            SettleState::Resolved
        } else {
            SettleState::Rejected
        };
        if let SettleState::Pending(tx) = std::mem::replace(&mut *state, next) {
            // The receiver is gone once a timeout has already settled the request.
            let _ = tx.send(outcome);
        }
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), SettleState::Pending(_))
    }
}

fn log(defaults: &Defaults, message: std::fmt::Arguments<'_>) {
    if defaults.enable_logs {
        tracing::info!(target: "ajax_core", "{message}");
    }
}
