// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Role configuration.
//!
//! A [`ClientConfig`] names which time roles a node runs. Either role, both,
//! or neither may be configured. [`TimeConfig`] validates its address when it
//! is built, including when it is deserialized, so a configuration that
//! loaded successfully can always be encoded on the wire.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "config-file")]
//! # fn main() -> Result<(), sensorlink_client::error::ConfigError> {
//! use sensorlink_client::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(
//!     r#"
//!     [time_client]
//!     address = "greenhouse"
//!     passphrase = "correct horse"
//!     "#,
//! )?;
//!
//! assert!(config.time_server.is_none());
//! assert_eq!(config.time_client.unwrap().address().as_str(), "greenhouse");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "config-file"))]
//! # fn main() {}
//! ```

use core::fmt;
#[cfg(feature = "config-file")]
use std::path::Path;

use sensorlink_proto::datagram::Address;
use sensorlink_proto::keys::Credentials;
use serde::Deserialize;

use crate::error::ConfigError;

/// Address and passphrase for one time role.
///
/// The passphrase keys the HMAC directly and, through
/// [`SymmetricKey::derive_from_passphrase`](sensorlink_proto::keys::SymmetricKey::derive_from_passphrase),
/// also yields the AES key for time datagrams.
#[derive(Clone, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawTimeConfig")]
pub struct TimeConfig {
    address: Address,
    passphrase: String,
}

impl TimeConfig {
    /// Validate and build a time configuration.
    pub fn new(
        address: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(TimeConfig {
            address: Address::new(address)?,
            passphrase: passphrase.into(),
        })
    }

    /// The address whose `/time` channels this role uses.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The shared passphrase.
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// HMAC and AES key material for this role's time datagrams.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_passphrase(self.passphrase.as_bytes())
    }
}

impl fmt::Debug for TimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeConfig")
            .field("address", &self.address)
            .field("passphrase", &"..")
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeConfig {
    address: String,
    passphrase: String,
}

impl TryFrom<RawTimeConfig> for TimeConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTimeConfig) -> Result<Self, Self::Error> {
        TimeConfig::new(raw.address, raw.passphrase)
    }
}

/// Which time roles to run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Answer time requests on `{address}/time/request`.
    #[serde(default)]
    pub time_server: Option<TimeConfig>,
    /// Synchronize from a time server on `{address}/time`.
    #[serde(default)]
    pub time_client: Option<TimeConfig>,
}

impl ClientConfig {
    /// A configuration with no roles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time server role.
    pub fn with_time_server(mut self, config: TimeConfig) -> Self {
        self.time_server = Some(config);
        self
    }

    /// Set the time client role.
    pub fn with_time_client(mut self, config: TimeConfig) -> Self {
        self.time_client = Some(config);
        self
    }

    /// Parse a TOML document with optional `[time_server]` and
    /// `[time_client]` tables.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    #[cfg(feature = "config-file")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_config_validates_address() {
        assert!(TimeConfig::new("a".repeat(255), "pw").is_ok());
        assert!(matches!(
            TimeConfig::new("a".repeat(256), "pw"),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_debug_hides_passphrase() {
        let config = TimeConfig::new("dev1", "hunter2").unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("dev1"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_credentials_follow_passphrase() {
        let a = TimeConfig::new("dev1", "pw").unwrap();
        let b = TimeConfig::new("dev2", "pw").unwrap();
        assert_eq!(a.credentials(), b.credentials());
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new()
            .with_time_server(TimeConfig::new("hub", "a").unwrap())
            .with_time_client(TimeConfig::new("hub", "a").unwrap());
        assert!(config.time_server.is_some());
        assert!(config.time_client.is_some());
        assert_eq!(ClientConfig::new(), ClientConfig::default());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_both_roles() {
        let config = ClientConfig::from_toml_str(
            r#"
            [time_server]
            address = "hub"
            passphrase = "s"

            [time_client]
            address = "upstream"
            passphrase = "c"
            "#,
        )
        .unwrap();
        assert_eq!(config.time_server.unwrap().address().as_str(), "hub");
        let client = config.time_client.unwrap();
        assert_eq!(client.address().as_str(), "upstream");
        assert_eq!(client.passphrase(), "c");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_empty() {
        assert_eq!(ClientConfig::from_toml_str("").unwrap(), ClientConfig::default());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_rejects_long_address() {
        let text = format!("[time_client]\naddress = \"{}\"\npassphrase = \"pw\"\n", "a".repeat(256));
        assert!(matches!(
            ClientConfig::from_toml_str(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(ClientConfig::from_toml_str("[time_client]\naddress = \"a\"\npassphrase = \"b\"\nport = 1\n").is_err());
        assert!(ClientConfig::from_toml_str("[time_relay]\naddress = \"a\"\n").is_err());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/sensorlink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
