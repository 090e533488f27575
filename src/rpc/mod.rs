//! JSON-RPC access to the chain.
//!
//! This module provides:
//! - The [`Transport`] seam (HTTP or WebSocket, chosen by URL scheme)
//! - A typed [`RpcClient`] over the methods used to fill and submit transactions

mod client;
mod http;
mod jsonrpc;
#[cfg(test)]
pub(crate) mod mock;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use client::RpcClient;
pub use http::HttpTransport;
pub use jsonrpc::{parse_quantity, to_quantity};
pub use ws::WsTransport;

/// Public endpoint used when no RPC URL is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";

/// Upper bound on one request, from send to response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised at the RPC boundary.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket transport error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed")]
    Closed,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported RPC URL {0:?} (expected http://, https://, ws:// or wss://)")]
    UnsupportedScheme(String),

    /// The node answered with a JSON-RPC error object.
    #[error("{message} (code {code})")]
    Response {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpcError {
    /// Short category name, used when a failure has no more specific classification.
    pub fn class_name(&self) -> &'static str {
        match self {
            RpcError::Http(_) => "HttpRequestError",
            RpcError::WebSocket(_) => "WebSocketRequestError",
            RpcError::Closed => "SocketClosedError",
            RpcError::Timeout(_) => "TimeoutError",
            RpcError::UnsupportedScheme(_) => "UrlRequiredError",
            RpcError::Response { .. } => "RpcRequestError",
            RpcError::Decode(_) => "DecodeError",
            RpcError::Json(_) => "JsonError",
        }
    }

    /// True for failures of the connection itself rather than of the request.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RpcError::Http(_) | RpcError::WebSocket(_) | RpcError::Closed | RpcError::Timeout(_)
        )
    }
}

/// Sends one JSON-RPC request and returns its `result`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// Opens a transport for `url`: WebSocket for `ws://`/`wss://`, HTTP for `http://`/`https://`.
pub async fn connect(url: &str) -> Result<Arc<dyn Transport>, RpcError> {
    let lower = url.trim().to_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(Arc::new(WsTransport::connect(url.trim()).await?))
    } else if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(Arc::new(HttpTransport::new(url.trim())?))
    } else {
        Err(RpcError::UnsupportedScheme(url.to_string()))
    }
}

/// Returns true if `connect` would accept the URL's scheme.
pub fn is_supported_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    ["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}
