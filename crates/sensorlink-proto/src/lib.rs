// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Authenticated, encrypted datagram envelope for sensor pub/sub traffic.
//!
//! A datagram carries a cleartext routing header (type, version, encoding,
//! source address) followed by an AES-128-CBC ciphertext and an
//! HMAC-SHA-256 tag. Anyone can read the header to route or filter; only
//! holders of the passphrase and key can verify and read the body, and a
//! body moved under a different header is detected.
//!
//! This crate does no I/O and holds no state.
//!
//! # Example
//!
//! ```
//! use sensorlink_proto::codec;
//! use sensorlink_proto::datagram::{self, Address, Encoding};
//! use sensorlink_proto::keys::{Iv, SymmetricKey};
//!
//! let address = Address::new("greenhouse/3").unwrap();
//! let key = SymmetricKey::new(*b"0123456789abcdef");
//! let bytes = codec::encode(
//!     &address,
//!     b"passphrase",
//!     &key,
//!     &Iv::random(),
//!     1_700_000_000,
//!     Encoding::Json,
//!     br#"{"value":21.5}"#,
//! )
//! .unwrap();
//!
//! // Routing needs no secret.
//! let header = datagram::parse_public_header(&bytes).unwrap();
//! assert_eq!(header.source_address, "greenhouse/3");
//!
//! let decoded = codec::decode(&bytes, b"passphrase", &key).unwrap();
//! assert_eq!(decoded.payload, br#"{"value":21.5}"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Error types for header parsing, encoding, and verification.
pub mod error;

/// Wire enums, validated newtypes, and public header parsing.
pub mod datagram;

/// Validated key, IV, and credential types.
pub mod keys;

/// Datagram encode and decode (AES-128-CBC + HMAC-SHA-256).
pub mod codec;

/// Time response datagrams for the time synchronization protocol.
pub mod time;

pub use codec::{Decoded, decode, encode};
pub use datagram::{Address, DatagramType, Encoding, PublicHeader, Version, parse_public_header};
pub use error::{AddressError, DecodeError, EncodeError, HeaderError, KeyLengthError};
pub use keys::{Credentials, Iv, SymmetricKey};
