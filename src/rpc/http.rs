//! JSON-RPC over HTTP(S).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::jsonrpc::{Request, Response};
use super::{RpcError, Transport, CONNECT_TIMEOUT, REQUEST_TIMEOUT};

/// One POST per request; the underlying reqwest client pools connections.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn post(&self, request: &Request<'_>) -> Result<Response, reqwest::Error> {
        self.client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::trace!("-> {} #{}", method, id);

        let response = self
            .post(&Request::new(id, method, params))
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout(self.timeout)
                } else {
                    RpcError::Http(e)
                }
            })?;

        response.into_result()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_posts_and_decodes_result() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"jsonrpc":"2.0","id":1,"result":"0x38"}"#;
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });

        let transport = HttpTransport::new(format!("http://{}", addr)).unwrap();
        let result = transport.request("eth_chainId", json!([])).await.unwrap();
        assert_eq!(result, json!("0x38"));
    }

    #[tokio::test]
    async fn test_silent_node_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // hold the connection open without answering
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let timeout = Duration::from_millis(100);
        let transport = HttpTransport::with_timeout(format!("http://{}", addr), timeout).unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            transport.request("eth_chainId", json!([])),
        )
        .await
        .expect("transport gave up on its own")
        .unwrap_err();
        assert!(matches!(err, RpcError::Timeout(t) if t == timeout));
        assert!(err.is_network());
    }
}
