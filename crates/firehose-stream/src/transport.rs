//! The feed transport seam.
//!
//! A transport opens connections to the feed server. The client never
//! touches sockets itself; it is handed a `FeedTransport` at construction.

use async_trait::async_trait;
use firehose_core::TransportError;
use tokio::sync::mpsc;

/// One open feed connection.
///
/// `inbound` yields text frames in arrival order. It ends when the
/// connection closes; an `Err` item reports a failure and is the last item.
/// Frames pushed into `outbound` are sent to the server as text.
#[derive(Debug)]
pub struct FeedConnection {
    pub inbound: mpsc::Receiver<Result<String, TransportError>>,
    pub outbound: mpsc::Sender<String>,
}

/// Opens connections to a firehose feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Where this transport connects to.
    fn endpoint(&self) -> &str;

    /// Open a new connection.
    async fn connect(&self) -> Result<FeedConnection, TransportError>;

    /// `true` while the most recently opened connection is alive.
    fn is_connected(&self) -> bool;
}
