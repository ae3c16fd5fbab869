// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for datagram construction, header parsing, and verification.
//!
//! Errors raised while handling bytes that arrived over the network
//! ([`HeaderError`], [`DecodeError`]) are always recoverable. Decoding
//! deliberately collapses every authentication, padding, and tamper-check
//! failure into the single opaque [`DecodeError`] so that a peer controlling
//! the input learns nothing about which check rejected it.
//!
//! All error types convert into [`std::io::Error`] for callers that work in
//! `io::Result`.

use std::io;

use thiserror::Error;

/// The public (cleartext) header of a datagram could not be parsed.
///
/// The public header carries no secret material, so the specific reason is
/// reported to the caller.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum HeaderError {
    /// The buffer is shorter than the fixed header plus address length byte.
    #[error("malformed datagram: {len} bytes is shorter than the 4-byte header")]
    TooShort {
        /// Number of bytes available.
        len: usize,
    },
    /// The type byte is not `M` or `C`.
    #[error("malformed datagram: unknown type tag 0x{0:02x}")]
    UnknownType(u8),
    /// The version byte is not the ASCII digit of a supported version.
    #[error("malformed datagram: unsupported version byte 0x{0:02x}")]
    UnsupportedVersion(u8),
    /// The encoding byte is not `B` or `J`.
    #[error("malformed datagram: unknown encoding tag 0x{0:02x}")]
    UnknownEncoding(u8),
    /// The declared source address extends beyond the buffer.
    #[error("malformed datagram: address of {declared} bytes exceeds the {available} remaining")]
    AddressOverflow {
        /// Address length declared by the length byte.
        declared: usize,
        /// Bytes remaining after the length byte.
        available: usize,
    },
}

/// A datagram failed verification or decryption.
///
/// MAC mismatch, inconsistent lengths, bad padding, and a cleartext header
/// that disagrees with the encrypted copy all produce this same value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Error)]
#[error("invalid datagram")]
pub struct DecodeError;

/// A datagram could not be built from the given parts.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EncodeError {
    /// IV, ciphertext length field, and ciphertext together exceed the
    /// 16-bit authenticated section length.
    #[error("payload too long: authenticated section would be {section_len} bytes (max 65535)")]
    PayloadTooLong {
        /// Size the authenticated section would have had.
        section_len: usize,
    },
}

/// A source address is longer than its one-byte length prefix allows.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("source address is {len} bytes long (max 255)")]
pub struct AddressError {
    /// Length of the rejected address in bytes.
    pub len: usize,
}

/// A byte slice of the wrong length was offered as a key or IV.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{what} must be exactly {expected} bytes, got {actual}")]
pub struct KeyLengthError {
    /// Which value was being constructed ("key" or "IV").
    pub what: &'static str,
    /// Required length.
    pub expected: usize,
    /// Length that was supplied.
    pub actual: usize,
}

impl From<HeaderError> for io::Error {
    fn from(err: HeaderError) -> io::Error {
        let kind = match &err {
            HeaderError::TooShort { .. } => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

impl From<EncodeError> for io::Error {
    fn from(err: EncodeError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

impl From<AddressError> for io::Error {
    fn from(err: AddressError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

impl From<KeyLengthError> for io::Error {
    fn from(err: KeyLengthError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}
