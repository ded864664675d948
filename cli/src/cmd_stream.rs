//! `firehose stream`: run the client and print decoded events.

use anyhow::{Context, Result};
use firehose_observability::init_tracing;
use firehose_registry::HttpChainQuery;
use firehose_stream::{FirehoseClient, FirehoseConfig, WsFeedTransport};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

pub async fn run(config_path: &str, verbose: bool) -> Result<()> {
    let mut config = FirehoseConfig::from_file(config_path)
        .with_context(|| format!("load config '{}'", config_path))?;
    if verbose {
        config.log.level = "debug".into();
    }
    init_tracing(&config.log).context("initialise logging")?;

    let query = HttpChainQuery::new(&config.chain_endpoint, config.request_timeout())?;
    let transport = WsFeedTransport::new(&config.server).with_buffer(config.channel_capacity);
    let client = FirehoseClient::new(config, Arc::new(transport), Arc::new(query));

    let mut events = client.subscribe();
    let mut errors = client.subscribe_errors();
    let mut runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", event.to_json()?),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "output fell behind, events skipped");
                }
                Err(RecvError::Closed) => break,
            },
            Ok(err) = errors.recv() => {
                eprintln!("transport: {}", err);
            }
            _ = tokio::signal::ctrl_c() => {
                client.shutdown();
                break;
            }
            finished = &mut runner => {
                finished.context("client task panicked")??;
                return Ok(());
            }
        }
    }

    runner.await.context("client task panicked")??;
    let m = client.metrics();
    eprintln!(
        "decoded {} events, {} errors, {} reconnections",
        m.events_decoded, m.decode_errors, m.reconnections
    );
    Ok(())
}
