// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Time client role.
//!
//! On start the client subscribes to `{address}/time`, publishes one request
//! on `{address}/time/request`, and then re-requests once per
//! [`RETRY_INTERVAL`] until a valid time datagram arrives. The retry cadence
//! is flat and unbounded; the broker is assumed lossy.
//!
//! Each valid datagram replaces the [`SyncBase`], so unsolicited time
//! datagrams keep refreshing the local clock after the retry loop has
//! ended. Nothing triggers a resync on its own once synced.
//!
//! The current base is published through a `tokio::sync::watch` channel:
//!
//! ```no_run
//! # async fn run(client: sensorlink_client::time_client::TimeClient) {
//! let mut rx = client.watch();
//! while rx.changed().await.is_ok() {
//!     if let Some(base) = *rx.borrow() {
//!         println!("server time is now {}", base.extrapolate());
//!     }
//! }
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use sensorlink_proto::datagram::Address;
use sensorlink_proto::keys::Credentials;
use sensorlink_proto::time::disassemble_time;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::TimeConfig;
use crate::error::ClientError;
use crate::transport::{PubSubClient, time_channel, time_request_channel};

/// Delay between time requests while unsynced.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// The last server timestamp received and the local instant it arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncBase {
    /// Server time in seconds since the Unix epoch.
    pub timestamp: i32,
    /// Local monotonic instant the timestamp was accepted.
    pub received_at: Instant,
}

impl SyncBase {
    /// Server time now, extrapolated from the base in whole seconds.
    pub fn extrapolate(&self) -> i64 {
        self.extrapolate_at(Instant::now())
    }

    /// Server time at `now`. Instants before the base yield the base.
    pub fn extrapolate_at(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.received_at).as_secs();
        i64::from(self.timestamp).saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}

/// Keeps a local view of a time server's clock.
///
/// Cloning yields another handle to the same role.
#[derive(Clone)]
pub struct TimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: TimeConfig,
    credentials: Credentials,
    transport: Arc<dyn PubSubClient>,
    request_channel: String,
    time_channel: String,
    state: watch::Sender<Option<SyncBase>>,
    // Present while running; dropping or signalling it ends the retry loop.
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl TimeClient {
    /// Create a stopped, unsynced client for `config.address()`.
    pub fn new(config: TimeConfig, transport: Arc<dyn PubSubClient>) -> Self {
        let credentials = config.credentials();
        let request_channel = time_request_channel(config.address());
        let time_channel = time_channel(config.address());
        let (state, _) = watch::channel(None);
        TimeClient {
            inner: Arc::new(ClientInner {
                config,
                credentials,
                transport,
                request_channel,
                time_channel,
                state,
                shutdown: Mutex::new(None),
            }),
        }
    }

    /// Subscribe, send the first request, and spawn the retry loop on the
    /// current tokio runtime.
    pub fn start(&self) -> Result<(), ClientError> {
        let handle = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let inner = &self.inner;

        let shutdown_rx = {
            let mut running = inner.lock_shutdown();
            if running.is_some() {
                return Err(ClientError::AlreadyStarted {
                    role: "time client",
                    address: inner.config.address().to_string(),
                });
            }
            let (tx, rx) = watch::channel(false);
            *running = Some(tx);
            rx
        };

        let weak = Arc::downgrade(inner);
        inner.transport.subscribe(
            &inner.time_channel,
            Arc::new(move |_channel: &str, data: &[u8]| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_time(data);
                }
            }),
        );
        debug!(addr = %inner.config.address(), "time client started");

        inner.send_request();
        handle.spawn(retry_loop(Arc::downgrade(inner), shutdown_rx));
        Ok(())
    }

    /// End the retry loop and unsubscribe. The last sync base is kept.
    pub fn stop(&self) {
        let inner = &self.inner;
        let Some(shutdown) = inner.lock_shutdown().take() else {
            return;
        };
        let _ = shutdown.send(true);
        inner.transport.unsubscribe(&inner.time_channel);
        debug!(addr = %inner.config.address(), "time client stopped");
    }

    /// Whether the client has been started and not stopped.
    pub fn is_running(&self) -> bool {
        self.inner.lock_shutdown().is_some()
    }

    /// Whether a valid time datagram has been received.
    pub fn is_synced(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// The current sync base, if synced.
    pub fn sync_base(&self) -> Option<SyncBase> {
        *self.inner.state.borrow()
    }

    /// Server time now, or `None` before the first valid time datagram.
    pub fn now(&self) -> Option<i64> {
        self.sync_base().map(|base| base.extrapolate())
    }

    /// Wait until the client is synced and return the base.
    ///
    /// Returns immediately if already synced.
    pub async fn wait_synced(&self) -> SyncBase {
        let mut rx = self.inner.state.subscribe();
        loop {
            if let Some(base) = *rx.borrow_and_update() {
                return base;
            }
            // The sender lives in `self.inner`, so this only fails if it is
            // dropped, which cannot happen while `self` is borrowed.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Subscribe to sync base updates.
    pub fn watch(&self) -> watch::Receiver<Option<SyncBase>> {
        self.inner.state.subscribe()
    }

    /// The address of the server this client syncs from.
    pub fn address(&self) -> &Address {
        self.inner.config.address()
    }
}

impl std::fmt::Debug for TimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeClient")
            .field("address", self.address())
            .field("running", &self.is_running())
            .field("sync_base", &self.sync_base())
            .finish()
    }
}

impl ClientInner {
    fn lock_shutdown(&self) -> MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.shutdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_request(&self) {
        self.transport.publish(&self.request_channel, &[]);
        debug!(addr = %self.config.address(), "sent time request");
    }

    fn on_time(&self, data: &[u8]) {
        match disassemble_time(data, self.config.address(), &self.credentials) {
            Ok(timestamp) => {
                self.state.send_replace(Some(SyncBase {
                    timestamp,
                    received_at: Instant::now(),
                }));
                debug!(addr = %self.config.address(), timestamp, "received time");
            }
            Err(e) => info!(addr = %self.config.address(), "ignoring time datagram: {}", e),
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // The time callback only holds a weak handle; remove it with us.
        let running = self
            .shutdown
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if running.is_some() {
            self.transport.unsubscribe(&self.time_channel);
            debug!(addr = %self.config.address(), "time client dropped while running");
        }
    }
}

async fn retry_loop(weak: Weak<ClientInner>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(RETRY_INTERVAL) => {}
            _ = shutdown.changed() => return,
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.state.borrow().is_some() {
            debug!(addr = %inner.config.address(), "synced, retry loop done");
            return;
        }
        inner.send_request();
    }
}
