//! JSON-RPC over one persistent WebSocket.
//!
//! Requests from concurrent callers share the socket; a background reader routes each
//! response to its caller by request id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::jsonrpc::{Request, Response};
use super::{RpcError, Transport, CONNECT_TIMEOUT, REQUEST_TIMEOUT};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>>>;

pub struct WsTransport {
    writer: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    timeout: Duration,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self, RpcError> {
        Self::connect_with_timeout(url, REQUEST_TIMEOUT).await
    }

    /// Connects; each later request fails with `Timeout` if no reply arrives within `timeout`.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let connect_timeout = CONNECT_TIMEOUT.min(timeout);
        let (stream, _) = tokio::time::timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| RpcError::Timeout(connect_timeout))??;
        let (writer, reader) = stream.split();

        let pending: Pending = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(reader, pending.clone(), closed.clone()));

        log::debug!("websocket connected to {}", url);

        Ok(Self {
            writer: tokio::sync::Mutex::new(writer),
            pending,
            closed,
            timeout,
            next_id: AtomicU64::new(1),
            reader,
        })
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);

        // The reader sets `closed` before draining, so either the drain or this check sees us.
        if self.closed.load(Ordering::SeqCst) {
            self.forget(id);
            return Err(RpcError::Closed);
        }

        let text = serde_json::to_string(&Request::new(id, method, params))?;
        let sent = self.writer.lock().await.send(Message::Text(text)).await;
        if let Err(e) = sent {
            self.forget(id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(reply) => reply.unwrap_or(Err(RpcError::Closed)),
            Err(_) => {
                self.forget(id);
                Err(RpcError::Timeout(self.timeout))
            }
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut reader: SplitStream<WsStream>, pending: Pending, closed: Arc<AtomicBool>) {
    while let Some(message) = reader.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Ok(Message::Close(frame)) => {
                log::debug!("websocket closed by peer: {:?}", frame);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                log::warn!("websocket read failed: {}", e);
                break;
            }
        };

        let response: Response = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(e) => {
                log::debug!("ignoring unparseable websocket message: {}", e);
                continue;
            }
        };

        let Some(id) = response.id() else { continue };
        let waiter = pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if let Some(tx) = waiter {
            let _ = tx.send(response.into_result());
        }
    }

    closed.store(true, Ordering::SeqCst);
    let waiters: Vec<_> = pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .drain()
        .map(|(_, tx)| tx)
        .collect();
    for tx in waiters {
        let _ = tx.send(Err(RpcError::Closed));
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    type ServerStream = WebSocketStream<TcpStream>;

    /// Accepts one WebSocket client on a local port and hands it to `script`.
    async fn spawn_node<F, Fut>(script: F) -> String
    where
        F: FnOnce(ServerStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            script(ws).await;
        });
        format!("ws://{}", addr)
    }

    async fn next_request(ws: &mut ServerStream) -> Option<Value> {
        while let Some(message) = ws.next().await {
            if let Ok(Message::Text(text)) = message {
                return serde_json::from_str(&text).ok();
            }
        }
        None
    }

    fn pending_len(transport: &WsTransport) -> usize {
        transport.pending.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_replies_routed_by_id_and_pending_fail_on_close() {
        let url = spawn_node(|mut ws| async move {
            let mut requests = Vec::new();
            while requests.len() < 3 {
                match next_request(&mut ws).await {
                    Some(request) => requests.push(request),
                    None => return,
                }
            }

            // newest id first; "eth_syncing" is left unanswered
            requests.sort_by_key(|r| std::cmp::Reverse(r["id"].as_u64()));
            for request in requests.iter().filter(|r| r["method"] != "eth_syncing") {
                let reply = json!({ "jsonrpc": "2.0", "id": request["id"], "result": request["method"] });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let transport = WsTransport::connect(&url).await.unwrap();
        let (chain_id, gas_price, syncing) = tokio::join!(
            transport.request("eth_chainId", json!([])),
            transport.request("eth_gasPrice", json!([])),
            transport.request("eth_syncing", json!([])),
        );

        assert_eq!(chain_id.unwrap(), json!("eth_chainId"));
        assert_eq!(gas_price.unwrap(), json!("eth_gasPrice"));
        assert!(matches!(syncing, Err(RpcError::Closed)));
        assert_eq!(pending_len(&transport), 0);

        assert!(matches!(
            transport.request("eth_chainId", json!([])).await,
            Err(RpcError::Closed)
        ));
        assert_eq!(pending_len(&transport), 0);
    }

    #[tokio::test]
    async fn test_error_reply_reaches_its_caller() {
        let url = spawn_node(|mut ws| async move {
            if let Some(request) = next_request(&mut ws).await {
                let reply = json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": { "code": -32000, "message": "nonce too low" }
                });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            while ws.next().await.is_some() {}
        })
        .await;

        let transport = WsTransport::connect(&url).await.unwrap();
        let err = transport
            .request("eth_sendRawTransaction", json!(["0x00"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Response { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_silent_node_times_out() {
        let url = spawn_node(|mut ws| async move {
            // read but never answer
            while ws.next().await.is_some() {}
        })
        .await;

        let timeout = Duration::from_millis(100);
        let transport = WsTransport::connect_with_timeout(&url, timeout).await.unwrap();

        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout(t) if t == timeout));
        assert_eq!(pending_len(&transport), 0);
    }
}
