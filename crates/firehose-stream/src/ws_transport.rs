//! WebSocket feed transport.
//!
//! Each connection gets a background task that owns the socket, forwards
//! text frames to the client, and writes the client's outbound frames.

use crate::transport::{FeedConnection, FeedTransport};
use async_trait::async_trait;
use firehose_core::TransportError;
use futures::{SinkExt, StreamExt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

type FrameSender = mpsc::Sender<Result<String, TransportError>>;

/// Frames buffered between the socket task and the client.
const DEFAULT_BUFFER: usize = 1024;

/// A `FeedTransport` over `tokio-tungstenite`.
#[derive(Debug)]
pub struct WsFeedTransport {
    url: String,
    buffer: usize,
    connected: Arc<AtomicBool>,
}

impl WsFeedTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            buffer: DEFAULT_BUFFER,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the inbound frame buffer size.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

#[async_trait]
impl FeedTransport for WsFeedTransport {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<FeedConnection, TransportError> {
        info!(url = %self.url, "connecting to firehose feed");
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| {
                self.connected.store(false, Ordering::Relaxed);
                TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                }
            })?;
        self.connected.store(true, Ordering::Relaxed);
        info!(url = %self.url, "firehose feed connected");

        let (frames_tx, frames_rx) = mpsc::channel(self.buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.buffer);

        tokio::spawn(socket_task(
            self.url.clone(),
            ws_stream,
            Arc::clone(&self.connected),
            frames_tx,
            outbound_rx,
        ));

        Ok(FeedConnection {
            inbound: frames_rx,
            outbound: outbound_tx,
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

async fn socket_task<S>(
    url: String,
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    connected: Arc<AtomicBool>,
    frames: FrameSender,
    mut outbound: mpsc::Receiver<String>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            // client dropped its end
            _ = frames.closed() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            out = outbound.recv() => {
                let Some(text) = out else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(url = %url, error = %e, "WS send failed");
                    let _ = frames.send(Err(TransportError::WebSocket(e.to_string()))).await;
                    break;
                }
            }
            msg = stream.next() => {
                match msg {
                    None => break,
                    Some(Err(e)) => {
                        warn!(url = %url, error = %e, "WS receive error");
                        let _ = frames.send(Err(TransportError::WebSocket(e.to_string()))).await;
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if frames.send(Ok(text.as_str().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if frames.send(Ok(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(_) => debug!(url = %url, "ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(url = %url, ?frame, "server closed the feed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    connected.store(false, Ordering::Relaxed);
    info!(url = %url, "firehose feed disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_reported() {
        let transport = WsFeedTransport::new("ws://127.0.0.1:1");
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { ref url, .. } if url == "ws://127.0.0.1:1"));
        assert!(!transport.is_connected());
        assert_eq!(transport.endpoint(), "ws://127.0.0.1:1");
    }
}
