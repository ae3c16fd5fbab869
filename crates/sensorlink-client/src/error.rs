// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for configuration and role lifecycle.
//!
//! Datagram-level failures are not surfaced here: a time response that does
//! not verify is logged and dropped by the role that received it, since
//! forged or corrupted traffic is expected on an untrusted broker.
//!
//! Callers that prefer `io::Result` can convert with `?`; the typed error
//! stays reachable through `io::Error::get_ref()`:
//!
//! ```
//! use sensorlink_client::config::TimeConfig;
//! use sensorlink_client::error::ConfigError;
//!
//! fn load() -> std::io::Result<TimeConfig> {
//!     Ok(TimeConfig::new("x".repeat(300), "pw")?)
//! }
//!
//! let err = load().unwrap_err();
//! let inner = err.get_ref().and_then(|e| e.downcast_ref::<ConfigError>());
//! assert!(matches!(inner, Some(ConfigError::InvalidAddress(_))));
//! ```

use std::io;
use std::path::PathBuf;

use sensorlink_proto::error::AddressError;
use thiserror::Error;

/// Errors from starting or configuring a client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid or unreadable configuration.
    #[error("client configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A role that spawns background work was started outside a tokio runtime.
    #[error("no tokio runtime available to run the time client retry loop")]
    NoRuntime,
    /// The role is already running.
    #[error("{role} for {address} is already running")]
    AlreadyStarted {
        /// Which role, `"time server"` or `"time client"`.
        role: &'static str,
        /// Address of the role.
        address: String,
    },
    /// [`CommClientBuilder::build`](crate::client::CommClientBuilder::build)
    /// was called without a transport.
    #[error("no transport configured")]
    MissingTransport,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An address does not fit in the datagram's one-byte length prefix.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    /// The configuration text is not valid TOML or has the wrong shape.
    #[cfg(feature = "config-file")]
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<ClientError> for io::Error {
    fn from(err: ClientError) -> io::Error {
        let kind = match &err {
            ClientError::Config(_) => io::ErrorKind::InvalidInput,
            ClientError::MissingTransport => io::ErrorKind::InvalidInput,
            ClientError::NoRuntime | ClientError::AlreadyStarted { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

impl From<ConfigError> for io::Error {
    fn from(err: ConfigError) -> io::Error {
        let kind = match &err {
            ConfigError::Read { source, .. } => source.kind(),
            _ => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}
