// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared test helpers for time sync integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sensorlink_client::client::CommClient;
use sensorlink_client::transport::{LocalBroker, LocalClient, PubSubClient};

/// Passphrase shared by the hub and its nodes in most tests.
pub(crate) const PASSPHRASE: &str = "greenhouse shared secret";

/// Counts messages delivered on one channel, over its own connection.
#[derive(Clone)]
pub(crate) struct ChannelCounter {
    count: Arc<AtomicUsize>,
    // Keeps the counting subscription alive.
    _link: Arc<LocalClient>,
}

impl ChannelCounter {
    /// Connect to `broker` and subscribe a counting callback to `channel`.
    pub(crate) fn attach(broker: &LocalBroker, channel: &str) -> Self {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let link = broker.client();
        link.subscribe(
            channel,
            Arc::new(move |_: &str, _: &[u8]| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        ChannelCounter { count, _link: link }
    }

    pub(crate) fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// A broker on the current runtime.
pub(crate) fn broker() -> LocalBroker {
    LocalBroker::new().expect("test runs inside a tokio runtime")
}

/// A node running only a time server for `address`, on its own connection.
pub(crate) fn hub(broker: &LocalBroker, address: &str) -> CommClient {
    CommClient::builder()
        .time_server(address, PASSPHRASE)
        .transport(broker.client())
        .build()
        .expect("valid hub config")
}

/// A node running only a time client syncing from `address`, on its own
/// connection.
#[allow(dead_code)]
pub(crate) fn node(broker: &LocalBroker, address: &str, passphrase: &str) -> CommClient {
    CommClient::builder()
        .time_client(address, passphrase)
        .transport(broker.client())
        .build()
        .expect("valid node config")
}

/// Let spawned deliveries run. Under paused time this also advances the
/// clock by `ms`.
pub(crate) async fn settle_for(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// A fresh connection as the trait object the roles take.
#[allow(dead_code)]
pub(crate) fn connect(broker: &LocalBroker) -> Arc<dyn PubSubClient> {
    broker.client()
}
