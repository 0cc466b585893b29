//! Status filters: reclassify a finished request as success or failure.
//!
//! # Design
//! A filter never changes the `TransportResult` it is given. It either hands
//! it back in `Ok` or wraps the very same value in `RequestError::Status`.

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::error::{ConfigError, RequestError};
use crate::http::TransportResult;

/// Some hosts report 204 No Content as 1223.
const QUIRK_NO_CONTENT: u16 = 1223;
const NO_CONTENT: u16 = 204;

static SUCCESS: LazyLock<StatusFilter> =
    LazyLock::new(|| StatusFilter::predicate(|status| (200..300).contains(&status) || status == 304));

/// What a filter accepts.
#[derive(Clone)]
pub enum Validator {
    Exact(u16),
    Predicate(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Exact(status) => f.debug_tuple("Exact").field(status).finish(),
            Validator::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<u16> for Validator {
    fn from(status: u16) -> Self {
        Validator::Exact(status)
    }
}

impl TryFrom<&Value> for Validator {
    type Error = ConfigError;

    /// Only numbers that fit a status code are accepted.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let kind = match value {
            Value::Number(n) => match n.as_u64().and_then(|n| u16::try_from(n).ok()) {
                Some(status) => return Ok(Validator::Exact(status)),
                None => "number out of status range",
            },
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        Err(ConfigError::UnsupportedValidator(kind.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct StatusFilter {
    validator: Validator,
}

impl StatusFilter {
    pub fn new(validator: impl Into<Validator>) -> Self {
        Self {
            validator: validator.into(),
        }
    }

    pub fn exact(status: u16) -> Self {
        Self::new(Validator::Exact(status))
    }

    pub fn predicate<F>(check: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        Self::new(Validator::Predicate(Arc::new(check)))
    }

    /// Build a filter from a dynamically typed validator.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        Validator::try_from(value).map(Self::new)
    }

    /// Whether `status` passes, after the 1223 remap.
    pub fn accepts(&self, status: u16) -> bool {
        let status = if status == QUIRK_NO_CONTENT { NO_CONTENT } else { status };
        match &self.validator {
            Validator::Exact(expected) => status == *expected,
            Validator::Predicate(check) => check(status),
        }
    }

    pub fn check(&self, result: TransportResult) -> Result<TransportResult, RequestError> {
        if self.accepts(result.status) {
            Ok(result)
        } else {
            Err(RequestError::Status(result))
        }
    }
}

/// Accepts any 2xx status and 304 Not Modified.
pub fn success() -> &'static StatusFilter {
    &SUCCESS
}
