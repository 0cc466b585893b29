//! Per-request settings and the shapes a caller can pass to `execute`.
//!
//! # Design
//! Every field of `RequestSettings` except `url` is optional; a missing
//! value falls back to the client's `Defaults` snapshot. A caller may hand
//! over a bare URL, a full settings value, or a URL plus options, and the
//! three forms collapse into one `RequestSettings` before validation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::http::{HttpMethod, Transport};

/// Ordered header list with case-insensitive unique names.
///
/// Serialized as a JSON object in insertion order. Deserializing goes
/// through `insert`, so names differing only in case collapse to the last
/// value seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `name`, replacing any existing entry regardless of case.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.insert(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Outgoing request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent verbatim.
    Text(String),
    /// Arrays and objects are JSON-encoded; `null` sends no body.
    Json(Value),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Body::Json)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

/// Settings for one request.
#[derive(Clone, Default)]
pub struct RequestSettings {
    pub url: String,
    pub method: Option<HttpMethod>,
    /// `Some(Duration::ZERO)` disables the timeout for this request.
    pub timeout: Option<Duration>,
    pub body: Option<Body>,
    /// Replaces the default headers when present.
    pub headers: Option<Headers>,
    /// Caller-owned transport; one is created per request otherwise.
    pub transport: Option<Arc<dyn Transport>>,
    pub cache_bust: Option<bool>,
    pub base: Option<String>,
}

impl fmt::Debug for RequestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSettings")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("transport", &self.transport.as_ref().map(|_| "<transport>"))
            .field("cache_bust", &self.cache_bust)
            .field("base", &self.base)
            .finish()
    }
}

impl RequestSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<HttpMethod>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = Some(enabled);
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Options object as a dynamically typed host would spell it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsonSettings {
    url: Option<String>,
    method: Option<String>,
    /// Milliseconds; 0 disables.
    timeout: Option<u64>,
    data: Option<Value>,
    headers: Option<Map<String, Value>>,
    #[serde(alias = "ie")]
    cache_bust: Option<bool>,
    base: Option<String>,
}

impl JsonSettings {
    fn from_value(value: &Value) -> Result<Self, ConfigError> {
        Self::deserialize(value).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    fn into_settings(self) -> RequestSettings {
        let headers = self.headers.map(|map| {
            map.into_iter()
                .map(|(name, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (name, value)
                })
                .collect()
        });
        RequestSettings {
            url: self.url.unwrap_or_default(),
            method: self.method.map(HttpMethod::from),
            timeout: self.timeout.map(Duration::from_millis),
            body: self.data.map(Body::Json),
            headers,
            transport: None,
            cache_bust: self.cache_bust,
            base: self.base,
        }
    }
}

/// The accepted calling conventions of `execute`.
#[derive(Debug, Clone)]
pub enum RequestInput {
    Url(String),
    Settings(RequestSettings),
    /// The URL always wins over `options.url`.
    UrlWithOptions(String, RequestSettings),
}

impl RequestInput {
    /// Normalize dynamically typed arguments: `(url)`, `(settings)` or
    /// `(url, options)`. A non-object second argument is ignored.
    pub fn from_json_args(args: &[Value]) -> Result<Self, ConfigError> {
        match args {
            [] => Err(ConfigError::MissingSettings),
            [Value::String(url), rest @ ..] => {
                let options = match rest.first() {
                    Some(options @ Value::Object(_)) => JsonSettings::from_value(options)?.into_settings(),
                    _ => RequestSettings::default(),
                };
                Ok(RequestInput::UrlWithOptions(url.clone(), options))
            }
            [settings @ Value::Object(_), ..] => {
                Ok(RequestInput::Settings(JsonSettings::from_value(settings)?.into_settings()))
            }
            [other, ..] => Err(ConfigError::InvalidSettings(format!("got {}", kind(other)))),
        }
    }

    /// Collapse into one settings value and check the URL.
    pub fn resolve(self) -> Result<RequestSettings, ConfigError> {
        let settings = match self {
            RequestInput::Url(url) => RequestSettings::new(url),
            RequestInput::Settings(settings) => settings,
            RequestInput::UrlWithOptions(url, mut options) => {
                options.url = url;
                options
            }
        };
        if settings.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(settings)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<RequestSettings> for RequestInput {
    fn from(settings: RequestSettings) -> Self {
        RequestInput::Settings(settings)
    }
}

impl<U: Into<String>> From<(U, RequestSettings)> for RequestInput {
    fn from((url, options): (U, RequestSettings)) -> Self {
        RequestInput::UrlWithOptions(url.into(), options)
    }
}
