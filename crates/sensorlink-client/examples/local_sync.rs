// Local time sync example demonstrating:
// - A hub (time server) and a sensor node (time client), each with its own
//   connection to one in-process broker
// - Request loss and the one-second retry loop
// - Sealing a sensor reading into a Message datagram with the synced time
//
// Run with:
//   RUST_LOG=debug cargo run -p sensorlink-client --example local_sync
//
// Load roles from a TOML file instead:
//   cargo run -p sensorlink-client --example local_sync -- node.toml

use std::time::Duration;

use sensorlink_client::client::CommClient;
use sensorlink_client::config::ClientConfig;
use sensorlink_client::transport::LocalBroker;
use sensorlink_proto::codec;
use sensorlink_proto::datagram::{Encoding, parse_public_header};
use sensorlink_proto::keys::Iv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const PASSPHRASE: &str = "greenhouse shared secret";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let broker = LocalBroker::new()?;
    // Lose the first two requests so the retry loop has something to do.
    broker.drop_next("hub/time/request", 2);

    let hub = CommClient::builder()
        .time_server("hub", PASSPHRASE)
        .transport(broker.client())
        .build()?;

    let node = match std::env::args().nth(1) {
        Some(path) => CommClient::new(ClientConfig::from_file(path)?, broker.client()),
        None => CommClient::builder()
            .time_client("hub", PASSPHRASE)
            .transport(broker.client())
            .build()?,
    };

    hub.start()?;
    node.start()?;
    info!("hub and node started");

    let Some(time_client) = node.time_client() else {
        warn!("configuration has no time client; nothing to sync");
        return Ok(());
    };

    let base = match tokio::time::timeout(Duration::from_secs(10), time_client.wait_synced()).await
    {
        Ok(base) => base,
        Err(_) => {
            warn!("node did not sync within 10 s");
            return Ok(());
        }
    };
    info!(timestamp = base.timestamp, "node synced");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let now = node.current_time().unwrap_or_default();
    info!(timestamp = now, "extrapolated hub time");

    // Seal a reading with the synced time and open it again.
    let config = time_client_config(&node)?;
    let credentials = config.credentials();
    let reading = br#"{"sensor":"soil-moisture","value":0.42}"#;
    let datagram = codec::encode(
        config.address(),
        credentials.passphrase(),
        credentials.key(),
        &Iv::random(),
        i32::try_from(now).unwrap_or(i32::MAX),
        Encoding::Json,
        reading,
    )?;
    let header = parse_public_header(&datagram)?;
    info!(
        kind = ?header.kind,
        source = %header.source_address,
        len = datagram.len(),
        "sealed reading"
    );
    let opened = codec::decode(&datagram, credentials.passphrase(), credentials.key())?;
    info!(
        timestamp = opened.timestamp,
        payload = %String::from_utf8_lossy(&opened.payload),
        "opened reading"
    );

    node.disconnect();
    info!("disconnected");
    Ok(())
}

fn time_client_config(
    node: &CommClient,
) -> Result<&sensorlink_client::config::TimeConfig, Box<dyn std::error::Error>> {
    node.config()
        .time_client
        .as_ref()
        .ok_or_else(|| "no time client configured".into())
}
