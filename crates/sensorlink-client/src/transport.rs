// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Publish/subscribe transport boundary.
//!
//! The time roles talk to the network only through [`PubSubClient`], one
//! node's connection to a broker. A transport is best-effort: `publish` may
//! silently lose, duplicate, or reorder messages, and callbacks may run
//! concurrently with each other.
//!
//! [`LocalBroker`] is an in-process broker. Each node connects with
//! [`LocalBroker::client`] and gets its own [`LocalClient`], so one node
//! unsubscribing or disconnecting never touches another node's
//! subscriptions. Every message is delivered on its own tokio task, and the
//! broker can be told to drop messages on a channel to exercise the retry
//! path.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::error::ClientError;

/// Callback invoked with `(channel, payload)` for each delivered message.
pub type PubSubCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// One node's best-effort publish/subscribe connection.
pub trait PubSubClient: Send + Sync {
    /// Close this connection and drop every subscription it made.
    fn disconnect(&self);

    /// Register one more callback for `channel`. Subscriptions are additive.
    fn subscribe(&self, channel: &str, callback: PubSubCallback);

    /// Remove every callback this connection registered for `channel`.
    fn unsubscribe(&self, channel: &str);

    /// Send `data` to every subscriber of `channel`, without any delivery or
    /// ordering guarantee.
    fn publish(&self, channel: &str, data: &[u8]);
}

/// Channel a time client publishes requests on.
///
/// ```
/// use sensorlink_client::transport::time_request_channel;
///
/// assert_eq!(time_request_channel("hub"), "hub/time/request");
/// ```
pub fn time_request_channel(address: impl fmt::Display) -> String {
    format!("{address}/time/request")
}

/// Channel a time server publishes time datagrams on.
pub fn time_channel(address: impl fmt::Display) -> String {
    format!("{address}/time")
}

struct Subscription {
    client: u64,
    callback: PubSubCallback,
}

#[derive(Default)]
struct BrokerState {
    subscriptions: HashMap<String, Vec<Subscription>>,
    pending_drops: HashMap<String, usize>,
    next_client: u64,
}

struct BrokerShared {
    state: Mutex<BrokerState>,
    handle: Handle,
}

impl BrokerShared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, channel: &str, data: &[u8]) {
        // Snapshot the callbacks so none of them runs under the lock.
        let callbacks: Vec<PubSubCallback> = {
            let mut state = self.lock();
            if let Some(remaining) = state.pending_drops.get_mut(channel)
                && *remaining > 0
            {
                *remaining -= 1;
                debug!(channel, remaining = *remaining, "dropping message");
                return;
            }
            match state.subscriptions.get(channel) {
                Some(subs) => subs.iter().map(|sub| Arc::clone(&sub.callback)).collect(),
                None => return,
            }
        };

        trace!(channel, len = data.len(), subscribers = callbacks.len(), "delivering");
        let channel: Arc<str> = Arc::from(channel);
        let data: Arc<[u8]> = Arc::from(data);
        for callback in callbacks {
            let channel = Arc::clone(&channel);
            let data = Arc::clone(&data);
            self.handle.spawn(async move {
                callback(&*channel, &*data);
            });
        }
    }

    /// Remove `client`'s subscriptions on `channel`, or on every channel.
    ///
    /// The removed callbacks are returned so the caller drops them after
    /// releasing the lock; a callback may own the last handle to a client.
    fn take(state: &mut BrokerState, client: u64, channel: Option<&str>) -> Vec<Subscription> {
        let mut removed = Vec::new();
        state.subscriptions.retain(|name, subs| {
            if channel.is_none_or(|c| c == name.as_str()) {
                let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(subs)
                    .into_iter()
                    .partition(|sub| sub.client == client);
                *subs = kept;
                removed.extend(gone);
            }
            !subs.is_empty()
        });
        removed
    }
}

/// In-process broker.
///
/// Nodes connect with [`client`](LocalBroker::client). Every callback
/// registered for a channel, by any connected client, receives each message
/// published on it, each on a separately spawned task.
///
/// Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct LocalBroker {
    shared: Arc<BrokerShared>,
}

impl LocalBroker {
    /// Create a broker that delivers on the current tokio runtime.
    pub fn new() -> Result<Self, ClientError> {
        let handle = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        Ok(Self::with_handle(handle))
    }

    /// Create a broker that delivers on the runtime behind `handle`.
    pub fn with_handle(handle: Handle) -> Self {
        LocalBroker {
            shared: Arc::new(BrokerShared {
                state: Mutex::new(BrokerState::default()),
                handle,
            }),
        }
    }

    /// Open a new connection for one node.
    pub fn client(&self) -> Arc<LocalClient> {
        let id = {
            let mut state = self.shared.lock();
            state.next_client += 1;
            state.next_client
        };
        trace!(client = id, "client connected");
        Arc::new(LocalClient {
            id,
            broker: Arc::clone(&self.shared),
            connected: AtomicBool::new(true),
        })
    }

    /// Silently discard the next `count` messages published on `channel`.
    ///
    /// Calls accumulate.
    pub fn drop_next(&self, channel: &str, count: usize) {
        let mut state = self.shared.lock();
        *state.pending_drops.entry(channel.to_owned()).or_default() += count;
    }

    /// Number of callbacks currently registered for `channel`, across all
    /// clients.
    pub fn subscription_count(&self, channel: &str) -> usize {
        self.shared.lock().subscriptions.get(channel).map_or(0, Vec::len)
    }
}

impl fmt::Debug for LocalBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("LocalBroker")
            .field("channels", &state.subscriptions.len())
            .field("clients", &state.next_client)
            .finish()
    }
}

/// One node's connection to a [`LocalBroker`].
///
/// Dropping the last handle disconnects it.
pub struct LocalClient {
    id: u64,
    broker: Arc<BrokerShared>,
    // Only changed under the broker lock.
    connected: AtomicBool,
}

impl LocalClient {
    /// Whether [`disconnect`](PubSubClient::disconnect) has not been called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of callbacks this client has registered for `channel`.
    pub fn subscription_count(&self, channel: &str) -> usize {
        self.broker
            .lock()
            .subscriptions
            .get(channel)
            .map_or(0, |subs| subs.iter().filter(|sub| sub.client == self.id).count())
    }
}

impl fmt::Debug for LocalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalClient")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl PubSubClient for LocalClient {
    fn disconnect(&self) {
        let removed = {
            let mut state = self.broker.lock();
            if !self.connected.swap(false, Ordering::SeqCst) {
                return;
            }
            BrokerShared::take(&mut state, self.id, None)
        };
        debug!(client = self.id, dropped = removed.len(), "local client disconnected");
    }

    fn subscribe(&self, channel: &str, callback: PubSubCallback) {
        let mut state = self.broker.lock();
        if !self.is_connected() {
            debug!(client = self.id, channel, "subscribe after disconnect ignored");
            return;
        }
        state
            .subscriptions
            .entry(channel.to_owned())
            .or_default()
            .push(Subscription {
                client: self.id,
                callback,
            });
        trace!(client = self.id, channel, "subscribed");
    }

    fn unsubscribe(&self, channel: &str) {
        let removed = BrokerShared::take(&mut self.broker.lock(), self.id, Some(channel));
        trace!(client = self.id, channel, dropped = removed.len(), "unsubscribed");
    }

    fn publish(&self, channel: &str, data: &[u8]) {
        if !self.is_connected() {
            return;
        }
        self.broker.publish(channel, data);
    }
}

impl Drop for LocalClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
