// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Node orchestrator.
//!
//! A [`CommClient`] owns the roles named by its [`ClientConfig`] and shares
//! one transport between them. A node may be a time server, a time client,
//! both (a relay that serves one address and syncs from another), or
//! neither.
//!
//! # Examples
//!
//! ```
//! # async fn example() -> Result<(), sensorlink_client::error::ClientError> {
//! use sensorlink_client::client::CommClient;
//! use sensorlink_client::transport::LocalBroker;
//!
//! let broker = LocalBroker::new()?;
//!
//! // Each node gets its own connection to the broker.
//! let hub = CommClient::builder()
//!     .time_server("hub", "shared secret")
//!     .transport(broker.client())
//!     .build()?;
//! let node = CommClient::builder()
//!     .time_client("hub", "shared secret")
//!     .transport(broker.client())
//!     .build()?;
//!
//! hub.start()?;
//! node.start()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::{ClientConfig, TimeConfig};
use crate::error::ClientError;
use crate::time_client::TimeClient;
use crate::time_server::TimeServer;
use crate::transport::PubSubClient;

/// Builder for [`CommClient`].
///
/// Addresses are validated by [`build()`](CommClientBuilder::build).
#[derive(Default)]
pub struct CommClientBuilder {
    time_server: Option<(String, String)>,
    time_client: Option<(String, String)>,
    transport: Option<Arc<dyn PubSubClient>>,
}

impl CommClientBuilder {
    /// Create a builder with no roles and no transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a time server answering on `address`.
    pub fn time_server(mut self, address: impl Into<String>, passphrase: impl Into<String>) -> Self {
        self.time_server = Some((address.into(), passphrase.into()));
        self
    }

    /// Run a time client syncing from the server on `address`.
    pub fn time_client(mut self, address: impl Into<String>, passphrase: impl Into<String>) -> Self {
        self.time_client = Some((address.into(), passphrase.into()));
        self
    }

    /// Set this node's transport connection, shared by all of its roles.
    pub fn transport(mut self, transport: Arc<dyn PubSubClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and create the client. Nothing is started.
    pub fn build(self) -> Result<CommClient, ClientError> {
        let transport = self.transport.ok_or(ClientError::MissingTransport)?;
        let config = ClientConfig {
            time_server: self
                .time_server
                .map(|(address, passphrase)| TimeConfig::new(address, passphrase))
                .transpose()?,
            time_client: self
                .time_client
                .map(|(address, passphrase)| TimeConfig::new(address, passphrase))
                .transpose()?,
        };
        Ok(CommClient::new(config, transport))
    }
}

/// The roles a node runs, wired to one transport.
pub struct CommClient {
    config: ClientConfig,
    transport: Arc<dyn PubSubClient>,
    time_server: Option<TimeServer>,
    time_client: Option<TimeClient>,
}

impl CommClient {
    /// Create a builder for configuring the client.
    pub fn builder() -> CommClientBuilder {
        CommClientBuilder::new()
    }

    /// Create the roles named by `config`. Nothing is started.
    pub fn new(config: ClientConfig, transport: Arc<dyn PubSubClient>) -> Self {
        let time_server = config
            .time_server
            .clone()
            .map(|cfg| TimeServer::new(cfg, Arc::clone(&transport)));
        let time_client = config
            .time_client
            .clone()
            .map(|cfg| TimeClient::new(cfg, Arc::clone(&transport)));
        CommClient {
            config,
            transport,
            time_server,
            time_client,
        }
    }

    /// Start every configured role.
    ///
    /// The time client needs a tokio runtime for its retry loop. If it fails
    /// to start, an already started server is stopped again.
    pub fn start(&self) -> Result<(), ClientError> {
        debug!(
            time_server = self.time_server.is_some(),
            time_client = self.time_client.is_some(),
            "starting client"
        );
        if let Some(server) = &self.time_server {
            server.start()?;
        }
        if let Some(client) = &self.time_client
            && let Err(e) = client.start()
        {
            if let Some(server) = &self.time_server {
                server.stop();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stop every running role.
    pub fn stop(&self) {
        if let Some(client) = &self.time_client {
            client.stop();
        }
        if let Some(server) = &self.time_server {
            server.stop();
        }
    }

    /// Stop all roles and disconnect this node's transport connection.
    pub fn disconnect(&self) {
        self.stop();
        self.transport.disconnect();
    }

    /// The time server role, if configured.
    pub fn time_server(&self) -> Option<&TimeServer> {
        self.time_server.as_ref()
    }

    /// The time client role, if configured.
    pub fn time_client(&self) -> Option<&TimeClient> {
        self.time_client.as_ref()
    }

    /// Synchronized server time, if a time client is configured and synced.
    pub fn current_time(&self) -> Option<i64> {
        self.time_client.as_ref().and_then(TimeClient::now)
    }

    /// The configuration the roles were built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// This node's transport connection.
    pub fn transport(&self) -> &Arc<dyn PubSubClient> {
        &self.transport
    }
}

impl std::fmt::Debug for CommClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommClient")
            .field("time_server", &self.time_server)
            .field("time_client", &self.time_client)
            .finish_non_exhaustive()
    }
}
