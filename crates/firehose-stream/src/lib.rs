//! # firehose-stream
//!
//! Streaming side of the firehose client.
//!
//! - `EventDispatcher`: raw envelope → `DecodedEvent`, one event at a time,
//!   failures isolated per event
//! - `FeedTransport`: the injected transport seam; `WsFeedTransport` speaks
//!   WebSocket, `ChannelFeedTransport` runs in-process
//! - `FirehoseClient`: connect, decode up to `max_in_flight` envelopes
//!   concurrently, broadcast results, reconnect with backoff
//!
//! ## Quick start
//! ```no_run
//! use firehose_registry::HttpChainQuery;
//! use firehose_stream::{FirehoseClient, FirehoseConfig, WsFeedTransport};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FirehoseConfig::from_file("firehose.yaml")?;
//! let query = HttpChainQuery::new(&config.chain_endpoint, config.request_timeout())?;
//! let transport = WsFeedTransport::new(&config.server);
//! let client = FirehoseClient::new(config, Arc::new(transport), Arc::new(query));
//!
//! let mut events = client.subscribe();
//! tokio::spawn({
//!     let client = client.clone();
//!     async move { client.run().await }
//! });
//! client.ready().await;
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod transport;
pub mod ws_transport;

pub use channel::{ChannelFeedTransport, FeedServer, ServerConnection};
pub use client::{ClientMetrics, FirehoseClient};
pub use config::{FirehoseConfig, ReconnectConfig, Subscription};
pub use dispatcher::{DispatcherStats, EventDispatcher};
pub use transport::{FeedConnection, FeedTransport};
pub use ws_transport::WsFeedTransport;
