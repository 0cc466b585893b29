//! Request defaults.
//!
//! # Design
//! `Defaults` is plain data threaded into each `Client`. The process-wide
//! instance below exists only as a convenience for `Client::global()` and
//! the free functions in the crate root. Every request takes a snapshot when
//! it is constructed, so later mutation only affects later requests.

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::http::HttpMethod;
use crate::types::Headers;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

static GLOBAL: LazyLock<Arc<ArcSwap<Defaults>>> =
    LazyLock::new(|| Arc::new(ArcSwap::from_pointee(Defaults::default())));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Defaults {
    pub enable_logs: bool,
    /// 0 disables the timeout.
    pub timeout_ms: u64,
    /// Append `_=<unix millis>` to every URL.
    pub cache_bust: bool,
    pub method: HttpMethod,
    pub headers: Headers,
    /// Prefixed to every request URL.
    pub base: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            enable_logs: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_bust: false,
            method: HttpMethod::Get,
            headers: Headers::new(),
            base: String::new(),
        }
    }
}

impl Defaults {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }
}

/// Shared handle to the process-wide defaults.
pub fn global() -> Arc<ArcSwap<Defaults>> {
    Arc::clone(&GLOBAL)
}

pub fn set_global(defaults: Defaults) {
    GLOBAL.store(Arc::new(defaults));
}

pub fn update_global(update: impl Fn(&mut Defaults)) {
    GLOBAL.rcu(|current| {
        let mut next = Defaults::clone(current);
        update(&mut next);
        next
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_defaults() {
        let defaults = Defaults::default();
        assert!(!defaults.enable_logs);
        assert_eq!(defaults.timeout_ms, 60_000);
        assert!(!defaults.cache_bust);
        assert_eq!(defaults.method, HttpMethod::Get);
        assert!(defaults.headers.is_empty());
        assert_eq!(defaults.base, "");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let defaults = Defaults::from_json_str(
            r#"{"enableLogs":true,"timeoutMs":250,"headers":{"X-App":"demo"}}"#,
        )
        .unwrap();
        assert!(defaults.enable_logs);
        assert_eq!(defaults.timeout_ms, 250);
        assert_eq!(defaults.headers.get("x-app"), Some("demo"));
        assert_eq!(defaults.method, HttpMethod::Get);
    }

    #[test]
    fn header_names_differing_in_case_collapse() {
        let defaults =
            Defaults::from_json_str(r#"{"headers":{"X-A":"1","x-a":"2","X-B":"3"}}"#).unwrap();
        assert_eq!(defaults.headers.len(), 2);
        assert_eq!(defaults.headers.get("X-A"), Some("2"));
    }

    #[test]
    fn headers_serialize_as_an_ordered_object() {
        let mut defaults = Defaults::default();
        defaults.headers.insert("X-Z", "1");
        defaults.headers.insert("X-A", "2");
        let json = serde_json::to_value(&defaults).unwrap();
        assert_eq!(json["headers"], serde_json::json!({ "X-Z": "1", "X-A": "2" }));
        let text = serde_json::to_string(&defaults.headers).unwrap();
        assert_eq!(text, r#"{"X-Z":"1","X-A":"2"}"#);
        assert_eq!(Defaults::from_json_str(&serde_json::to_string(&defaults).unwrap()).unwrap(), defaults);
    }

    #[test]
    fn header_list_form_is_rejected() {
        let err = Defaults::from_json_str(r#"{"headers":[["X-App","demo"]]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = Defaults::from_json_str(r#"{"timeoutMs":"soon"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }
}
