//! JSON-RPC server for tracking sessions.
//!
//! This module provides an HTTP server that:
//! - Accepts JSON-RPC 2.0 calls via POST /mcp
//! - Stores sessions and emotion rows in SQLite
//! - Reports productivity and analytics for a stored session
//!
//! # Methods
//!
//! ```text
//! start_session            {}                                   → {session_id, started_at}
//! stop_session             {session_id}                         → {session_id, ended_at}
//! send_emotion_data        {session_id, emotion, confidence?, timestamp?} → {status}
//! get_productivity_level   {session_id}                         → {productivity}
//! get_session_analytics    {session_id}                         → AnalyticsResult
//! ```

use crate::core::analytics::aggregate_in;
use crate::detector::types::Emotion;
use crate::store::{MoodStore, StoreError};
use axum::{
    extract::State,
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// JSON-RPC: invalid JSON
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC: not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: bad parameters
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC: handler failure
pub const INTERNAL_ERROR: i64 = -32603;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Database file; an in-memory database when `None`
    pub database_path: Option<PathBuf>,
    /// Time zone for session analytics; local time when `None`
    pub timezone: Option<chrono_tz::Tz>,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, database_path: Option<PathBuf>) -> Self {
        Self {
            port,
            database_path,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: Option<chrono_tz::Tz>) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Shared server state
pub struct ServerState {
    store: Mutex<MoodStore>,
    timezone: Option<chrono_tz::Tz>,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: &ServerConfig) -> Result<Self, StoreError> {
        let store = match &config.database_path {
            Some(path) => MoodStore::open(path)?,
            None => MoodStore::open_in_memory()?,
        };
        Ok(Self {
            store: Mutex::new(store),
            timezone: config.timezone,
        })
    }
}

/// Inbound JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(e: StoreError) -> Self {
        RpcError::new(INTERNAL_ERROR, e.to_string())
    }
}

/// Outbound JSON-RPC response
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl RpcResponse {
    fn from_result(id: Value, result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self {
                jsonrpc: "2.0",
                result: Some(value),
                error: None,
                id,
            },
            Err(error) => Self {
                jsonrpc: "2.0",
                result: None,
                error: Some(error),
                id,
            },
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Deserialize)]
struct SessionParams {
    session_id: String,
}

#[derive(Deserialize)]
struct EmotionParams {
    session_id: String,
    emotion: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, RpcError> {
    let params = if params.is_null() {
        json!({})
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(|e| RpcError::new(INVALID_PARAMS, e.to_string()))
}

/// Dispatch one JSON-RPC method against the store.
pub fn handle_method(
    store: &MoodStore,
    timezone: Option<&chrono_tz::Tz>,
    method: &str,
    params: &Value,
) -> Result<Value, RpcError> {
    match method {
        "start_session" => {
            let session = store.start_session()?;
            Ok(json!({
                "session_id": session.session_id,
                "started_at": session.started_at.to_rfc3339(),
            }))
        }
        "stop_session" => {
            let p: SessionParams = parse_params(params)?;
            let ended_at = store.stop_session(&p.session_id)?;
            Ok(json!({
                "session_id": p.session_id,
                "ended_at": ended_at.map(|t| t.to_rfc3339()),
            }))
        }
        "send_emotion_data" => {
            let p: EmotionParams = parse_params(params)?;
            let emotion: Emotion = p
                .emotion
                .parse()
                .map_err(|e: crate::detector::UnknownEmotion| {
                    RpcError::new(INVALID_PARAMS, e.to_string())
                })?;
            store.record_emotion(
                &p.session_id,
                emotion,
                p.confidence.unwrap_or(1.0),
                p.timestamp.unwrap_or_else(Utc::now),
            )?;
            Ok(json!({ "status": "ok" }))
        }
        "get_productivity_level" => {
            let p: SessionParams = parse_params(params)?;
            let productivity = store.productivity_level(&p.session_id)?;
            Ok(json!({ "productivity": productivity }))
        }
        "get_session_analytics" => {
            let p: SessionParams = parse_params(params)?;
            let history = store.session_emotions(&p.session_id)?;
            let result = match timezone {
                Some(tz) => aggregate_in(history.entries(), tz),
                None => aggregate_in(history.entries(), &Local),
            };
            serde_json::to_value(result).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
        }
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

/// Parse a request body.
///
/// On failure, returns the id to echo (null when none can be read) with a
/// parse or invalid-request error.
fn decode_request(body: &str) -> Result<RpcRequest, (Value, RpcError)> {
    let raw: Value = serde_json::from_str(body).map_err(|e| {
        (
            Value::Null,
            RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
        )
    })?;

    if !raw.is_object() {
        return Err((
            Value::Null,
            RpcError::new(INVALID_REQUEST, "Invalid request: expected an object"),
        ));
    }

    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| {
        (
            id,
            RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
        )
    })
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /mcp
///
/// Always answers 200 with a JSON-RPC envelope; failures are carried in
/// the `error` member.
async fn mcp(State(state): State<Arc<ServerState>>, body: String) -> Json<RpcResponse> {
    let request = match decode_request(&body) {
        Ok(request) => request,
        Err((id, error)) => return Json(RpcResponse::from_result(id, Err(error))),
    };

    if let Some(version) = request.jsonrpc.as_deref() {
        if version != "2.0" {
            tracing::debug!(version, "Non 2.0 JSON-RPC version in request");
        }
    }

    let result = {
        let store = state.store.lock().await;
        handle_method(&store, state.timezone.as_ref(), &request.method, &request.params)
    };

    if let Err(ref e) = result {
        tracing::warn!(method = %request.method, code = e.code, "RPC failed: {}", e.message);
    } else {
        tracing::debug!(method = %request.method, "RPC handled");
    }

    Json(RpcResponse::from_result(request.id, result))
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config)?);

    let app = Router::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Mood tracker server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(store: &MoodStore, method: &str, params: Value) -> Result<Value, RpcError> {
        handle_method(store, Some(&chrono_tz::UTC), method, &params)
    }

    #[test]
    fn test_session_flow() {
        let store = MoodStore::open_in_memory().unwrap();

        let started = call(&store, "start_session", Value::Null).unwrap();
        let id = started["session_id"].as_str().unwrap().to_string();

        for emotion in ["focused", "focused", "happy", "tired"] {
            let ok = call(
                &store,
                "send_emotion_data",
                json!({ "session_id": id, "emotion": emotion, "confidence": 0.9 }),
            )
            .unwrap();
            assert_eq!(ok["status"], "ok");
        }

        let level = call(&store, "get_productivity_level", json!({ "session_id": id })).unwrap();
        assert_eq!(level["productivity"], 0.5);

        let analytics = call(&store, "get_session_analytics", json!({ "session_id": id })).unwrap();
        assert_eq!(analytics["total_entries"], 4);
        assert_eq!(analytics["most_common"], "focused");

        let stopped = call(&store, "stop_session", json!({ "session_id": id })).unwrap();
        assert!(stopped["ended_at"].is_string());
    }

    #[test]
    fn test_error_codes() {
        let store = MoodStore::open_in_memory().unwrap();

        let err = call(&store, "unknown", Value::Null).unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);

        let err = call(&store, "stop_session", json!({})).unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);

        let err = call(
            &store,
            "send_emotion_data",
            json!({ "session_id": "x", "emotion": "angry" }),
        )
        .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);

        let err = call(
            &store,
            "send_emotion_data",
            json!({ "session_id": "missing", "emotion": "happy" }),
        )
        .unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
    }

    #[test]
    fn test_decode_request_errors() {
        let (id, err) = decode_request("{not json").unwrap_err();
        assert_eq!(id, Value::Null);
        assert_eq!(err.code, PARSE_ERROR);

        let (id, err) = decode_request("[]").unwrap_err();
        assert_eq!(id, Value::Null);
        assert_eq!(err.code, INVALID_REQUEST);

        let (id, err) = decode_request(r#"{"jsonrpc":"2.0","id":3}"#).unwrap_err();
        assert_eq!(id, json!(3));
        assert_eq!(err.code, INVALID_REQUEST);

        let request = decode_request(r#"{"jsonrpc":"2.0","method":"start_session","id":"a"}"#)
            .unwrap();
        assert_eq!(request.method, "start_session");
        assert_eq!(request.id, json!("a"));
        assert!(request.params.is_null());
    }

    #[test]
    fn test_response_envelope() {
        let ok = RpcResponse::from_result(json!(7), Ok(json!({ "status": "ok" })));
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert!(value.get("error").is_none());

        let err = RpcResponse::from_result(json!(8), Err(RpcError::new(INTERNAL_ERROR, "boom")));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"]["code"], -32603);
        assert!(value.get("result").is_none());
    }
}
