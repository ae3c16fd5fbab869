// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
Time synchronization roles for sensor nodes on an untrusted pub/sub broker.

A time server answers requests on `{address}/time/request` with a signed,
encrypted time datagram on `{address}/time`. A time client requests once a
second until it receives a valid datagram, then extrapolates server time
from its local monotonic clock. Datagrams use the envelope from
[`sensorlink_proto`].

# Example
Runs a hub and a node on an in-process broker and waits for the node to
sync.

```rust
use sensorlink_client::client::CommClient;
use sensorlink_client::transport::LocalBroker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), sensorlink_client::error::ClientError> {
    let broker = LocalBroker::new()?;

    let hub = CommClient::builder()
        .time_server("hub", "shared secret")
        .transport(broker.client())
        .build()?;
    let node = CommClient::builder()
        .time_client("hub", "shared secret")
        .transport(broker.client())
        .build()?;

    hub.start()?;
    node.start()?;

    let base = node.time_client().unwrap().wait_synced().await;
    println!("hub time: {}", base.timestamp);
    Ok(())
}
```

# Feature Flags

| Feature | Default | Description |
|---------|---------|-------------|
| `config-file` | yes | Load [`ClientConfig`](config::ClientConfig) from TOML via `toml`. |
*/

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export the datagram envelope for convenience.
pub use sensorlink_proto as proto;

/// Error types for configuration and role lifecycle.
pub mod error;

/// Role configuration.
pub mod config;

/// Pub/sub transport trait and the in-process broker.
pub mod transport;

/// Time server role.
pub mod time_server;

/// Time client role with its retry loop and extrapolated clock.
pub mod time_client;

/// Node orchestrator wiring configured roles to one transport.
pub mod client;

pub use client::{CommClient, CommClientBuilder};
pub use config::{ClientConfig, TimeConfig};
pub use error::{ClientError, ConfigError};
pub use time_client::{SyncBase, TimeClient};
pub use time_server::TimeServer;
pub use transport::{LocalBroker, LocalClient, PubSubCallback, PubSubClient};
