// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Time server role.
//!
//! Answers every message on `{address}/time/request` by publishing a signed
//! time datagram on `{address}/time`. The server keeps no per-request state,
//! so concurrent requests need no coordination. Requests are not rate
//! limited: each one produces exactly one response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use sensorlink_proto::datagram::Address;
use sensorlink_proto::keys::Credentials;
use sensorlink_proto::time::{assemble_time, unix_timestamp_now};
use tracing::{debug, warn};

use crate::config::TimeConfig;
use crate::error::ClientError;
use crate::transport::{PubSubClient, time_channel, time_request_channel};

/// Answers time requests for one address.
///
/// Cloning yields another handle to the same role.
#[derive(Clone)]
pub struct TimeServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    config: TimeConfig,
    credentials: Credentials,
    transport: Arc<dyn PubSubClient>,
    request_channel: String,
    time_channel: String,
    running: AtomicBool,
}

impl TimeServer {
    /// Create a stopped server for `config.address()`.
    pub fn new(config: TimeConfig, transport: Arc<dyn PubSubClient>) -> Self {
        let credentials = config.credentials();
        let request_channel = time_request_channel(config.address());
        let time_channel = time_channel(config.address());
        TimeServer {
            inner: Arc::new(ServerInner {
                config,
                credentials,
                transport,
                request_channel,
                time_channel,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Subscribe to the request channel.
    pub fn start(&self) -> Result<(), ClientError> {
        let inner = &self.inner;
        if inner.running.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyStarted {
                role: "time server",
                address: inner.config.address().to_string(),
            });
        }

        let weak: Weak<ServerInner> = Arc::downgrade(inner);
        inner.transport.subscribe(
            &inner.request_channel,
            Arc::new(move |_channel: &str, _data: &[u8]| {
                if let Some(inner) = weak.upgrade() {
                    inner.publish_time();
                }
            }),
        );
        debug!(addr = %inner.config.address(), "time server started");
        Ok(())
    }

    /// Unsubscribe from the request channel. Does nothing if not running.
    pub fn stop(&self) {
        let inner = &self.inner;
        if inner.running.swap(false, Ordering::SeqCst) {
            inner.transport.unsubscribe(&inner.request_channel);
            debug!(addr = %inner.config.address(), "time server stopped");
        }
    }

    /// Publish the current time without waiting for a request.
    ///
    /// Synced clients take any valid time datagram as a fresh base.
    pub fn publish_time(&self) {
        self.inner.publish_time();
    }

    /// Whether the server is subscribed to its request channel.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The address this server answers for.
    pub fn address(&self) -> &Address {
        self.inner.config.address()
    }
}

impl ServerInner {
    fn publish_time(&self) {
        let timestamp = unix_timestamp_now();
        match assemble_time(self.config.address(), &self.credentials, timestamp) {
            Ok(datagram) => {
                self.transport.publish(&self.time_channel, &datagram);
                debug!(addr = %self.config.address(), timestamp, "sent time");
            }
            Err(e) => warn!(addr = %self.config.address(), "failed to build time datagram: {}", e),
        }
    }
}

impl Drop for ServerInner {
    fn drop(&mut self) {
        // The request callback only holds a weak handle; remove it with us.
        if *self.running.get_mut() {
            self.transport.unsubscribe(&self.request_channel);
            debug!(addr = %self.config.address(), "time server dropped while running");
        }
    }
}

impl std::fmt::Debug for TimeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeServer")
            .field("address", self.address())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LocalBroker, LocalClient};
    use sensorlink_proto::time::disassemble_time;
    use std::sync::Mutex;
    use std::time::Duration;

    fn collect(link: &LocalClient, channel: &str) -> Arc<Mutex<Vec<Vec<u8>>>> {
        let got = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&got);
        link.subscribe(
            channel,
            Arc::new(move |_: &str, data: &[u8]| sink.lock().unwrap().push(data.to_vec())),
        );
        got
    }

    fn server(broker: &LocalBroker) -> TimeServer {
        TimeServer::new(TimeConfig::new("hub", "pw").unwrap(), broker.client())
    }

    #[tokio::test(start_paused = true)]
    async fn test_answers_each_request() {
        let broker = LocalBroker::new().unwrap();
        let peer = broker.client();
        let config = TimeConfig::new("hub", "pw").unwrap();
        let server = TimeServer::new(config.clone(), broker.client());
        server.start().unwrap();
        let responses = collect(&peer, "hub/time");

        peer.publish("hub/time/request", &[]);
        peer.publish("hub/time/request", b"ignored body");
        tokio::time::sleep(Duration::from_millis(1)).await;

        let responses = responses.lock().unwrap();
        assert_eq!(responses.len(), 2);
        for datagram in responses.iter() {
            let ts = disassemble_time(datagram, config.address(), &config.credentials()).unwrap();
            assert!(ts > 1_700_000_000);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unsubscribes() {
        let broker = LocalBroker::new().unwrap();
        let peer = broker.client();
        let server = server(&broker);
        server.start().unwrap();
        assert!(server.is_running());
        assert_eq!(broker.subscription_count("hub/time/request"), 1);

        server.stop();
        assert!(!server.is_running());
        assert_eq!(broker.subscription_count("hub/time/request"), 0);

        let responses = collect(&peer, "hub/time");
        peer.publish("hub/time/request", &[]);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(responses.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_other_subscribers() {
        let broker = LocalBroker::new().unwrap();
        let peer = broker.client();
        let requests = collect(&peer, "hub/time/request");
        let server = server(&broker);
        server.start().unwrap();
        assert_eq!(broker.subscription_count("hub/time/request"), 2);

        server.stop();
        assert_eq!(broker.subscription_count("hub/time/request"), 1);
        peer.publish("hub/time/request", &[]);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_rejected() {
        let broker = LocalBroker::new().unwrap();
        let server = server(&broker);
        server.start().unwrap();
        assert!(matches!(
            server.start(),
            Err(ClientError::AlreadyStarted { role: "time server", .. })
        ));
        assert_eq!(broker.subscription_count("hub/time/request"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_server_stops_answering() {
        let broker = LocalBroker::new().unwrap();
        let peer = broker.client();
        let server = server(&broker);
        server.start().unwrap();
        drop(server);

        let responses = collect(&peer, "hub/time");
        peer.publish("hub/time/request", &[]);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(responses.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_server_unsubscribes() {
        let broker = LocalBroker::new().unwrap();
        let link = broker.client();
        let server = TimeServer::new(TimeConfig::new("hub", "pw").unwrap(), link.clone());
        let other = server.clone();
        server.start().unwrap();
        drop(server);
        assert_eq!(link.subscription_count("hub/time/request"), 1);

        drop(other);
        assert_eq!(link.subscription_count("hub/time/request"), 0);
        assert!(link.is_connected());
    }
}
