//! Mock HTTP server for the request-layer conformance tests.
//!
//! - `ANY /dataset/{name}` serves a fixed dataset; `?latency=<ms>` delays the
//!   reply and `?status=<code>` overrides the status code.
//! - `ANY /ECHO` replies with the request body.
//! - `ANY /ECHO_HEADERS` replies with the request headers as a JSON object.

use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Debug, Default, Deserialize)]
pub struct DatasetOptions {
    pub latency: Option<u64>,
    pub status: Option<u16>,
}

/// Contents of `/dataset/sample01.json`.
pub fn sample01() -> Value {
    json!([
        { "name": "Jerome", "age": 20 },
        { "name": "Gerard", "age": 30 },
        { "name": "Martine", "age": 43 }
    ])
}

pub fn app() -> Router {
    Router::new()
        .route("/dataset/{name}", any(dataset))
        .route("/ECHO", any(echo))
        .route("/ECHO_HEADERS", any(echo_headers))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn dataset(Path(name): Path<String>, Query(options): Query<DatasetOptions>) -> Response {
    let (content_type, body) = match name.as_str() {
        "sample01.json" => ("application/json", sample01().to_string()),
        "empty" => ("application/octet-stream", String::new()),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    if let Some(ms) = options.latency {
        tracing::debug!("waiting {ms} ms");
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    let status = options
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

async fn echo(body: String) -> String {
    body
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();
    Json(headers)
}
