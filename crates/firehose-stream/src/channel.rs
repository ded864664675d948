//! In-process feed transport backed by tokio channels.
//!
//! The other end of every connection is handed to a [`FeedServer`], which
//! plays the feed: push frames, read the client's requests, fail or close
//! the connection. Suitable for testing and for replaying recorded feeds.

use crate::transport::{FeedConnection, FeedTransport};
use async_trait::async_trait;
use firehose_core::TransportError;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

const BUFFER: usize = 256;

/// A `FeedTransport` whose connections terminate in a [`FeedServer`].
#[derive(Debug)]
pub struct ChannelFeedTransport {
    endpoint: String,
    accept: mpsc::UnboundedSender<ServerConnection>,
    current: Mutex<Option<mpsc::WeakSender<Result<String, TransportError>>>>,
    refuse: AtomicUsize,
    connects: AtomicUsize,
}

impl ChannelFeedTransport {
    pub fn new(endpoint: impl Into<String>) -> (Self, FeedServer) {
        let (accept, incoming) = mpsc::unbounded_channel();
        let transport = Self {
            endpoint: endpoint.into(),
            accept,
            current: Mutex::new(None),
            refuse: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
        };
        (transport, FeedServer { incoming })
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.refuse.store(n, Ordering::SeqCst);
    }

    /// Connection attempts so far, refused ones included.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for ChannelFeedTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<FeedConnection, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::ConnectionFailed {
                url: self.endpoint.clone(),
                reason: "connection refused".into(),
            });
        }

        let (frames_tx, frames_rx) = mpsc::channel(BUFFER);
        let (requests_tx, requests_rx) = mpsc::channel(BUFFER);
        if let Ok(mut current) = self.current.lock() {
            *current = Some(frames_tx.downgrade());
        }
        self.accept
            .send(ServerConnection {
                frames: frames_tx,
                requests: requests_rx,
            })
            .map_err(|_| TransportError::ConnectionFailed {
                url: self.endpoint.clone(),
                reason: "feed server is gone".into(),
            })?;

        Ok(FeedConnection {
            inbound: frames_rx,
            outbound: requests_tx,
        })
    }

    fn is_connected(&self) -> bool {
        self.current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().and_then(|weak| weak.upgrade()))
            .is_some_and(|tx| !tx.is_closed())
    }
}

/// Accepts the server side of connections opened by a [`ChannelFeedTransport`].
#[derive(Debug)]
pub struct FeedServer {
    incoming: mpsc::UnboundedReceiver<ServerConnection>,
}

impl FeedServer {
    /// Wait for the next connection. `None` once the transport is dropped.
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.incoming.recv().await
    }
}

/// The server side of one connection. Dropping it closes the connection.
#[derive(Debug)]
pub struct ServerConnection {
    frames: mpsc::Sender<Result<String, TransportError>>,
    requests: mpsc::Receiver<String>,
}

impl ServerConnection {
    /// Push a text frame. Returns `false` if the client hung up.
    pub async fn send_frame(&self, frame: impl Into<String>) -> bool {
        self.frames.send(Ok(frame.into())).await.is_ok()
    }

    pub async fn send_json(&self, value: &Value) -> bool {
        self.send_frame(value.to_string()).await
    }

    /// Terminate the connection with a transport failure.
    pub async fn fail(self, error: TransportError) {
        let _ = self.frames.send(Err(error)).await;
    }

    /// Next request sent by the client, parsed as JSON.
    pub async fn next_request(&mut self) -> Option<Value> {
        let text = self.requests.recv().await?;
        Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
