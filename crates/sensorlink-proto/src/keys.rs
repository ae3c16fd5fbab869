// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Key material for the datagram envelope.
//!
//! [`SymmetricKey`] and [`Iv`] can only hold exactly 16 bytes, so the codec
//! never has to check their lengths. [`Credentials`] pairs the HMAC
//! passphrase with the AES key used for the same traffic.

use core::fmt;

use sha2::{Digest, Sha256};

use crate::error::KeyLengthError;

/// AES-128 key and CBC IV size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Domain separation prefix for keys derived from a passphrase.
const KEY_DERIVATION_LABEL: &[u8] = b"sensorlink/time/v0";

/// A 16-byte AES-128 key.
#[derive(Clone, Eq, PartialEq)]
pub struct SymmetricKey([u8; BLOCK_LEN]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; BLOCK_LEN]) -> Self {
        SymmetricKey(bytes)
    }

    /// Derive a key from a passphrase.
    ///
    /// The key is the first 16 bytes of
    /// `SHA-256("sensorlink/time/v0" || passphrase)`. This is how time
    /// datagrams obtain their AES key, since the time roles are only
    /// provisioned with a passphrase.
    pub fn derive_from_passphrase(passphrase: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_LABEL);
        hasher.update(passphrase);
        let digest = hasher.finalize();

        let mut key = [0u8; BLOCK_LEN];
        key.copy_from_slice(&digest[..BLOCK_LEN]);
        SymmetricKey(key)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }
}

impl From<[u8; BLOCK_LEN]> for SymmetricKey {
    fn from(bytes: [u8; BLOCK_LEN]) -> Self {
        SymmetricKey(bytes)
    }
}

impl TryFrom<&[u8]> for SymmetricKey {
    type Error = KeyLengthError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        to_block("key", value).map(SymmetricKey)
    }
}

// Keys stay out of logs.
impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A 16-byte CBC initialization vector.
///
/// An IV must never be reused with the same key for two different
/// plaintexts. [`Iv::random`] is the normal way to get one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Iv([u8; BLOCK_LEN]);

impl Iv {
    /// Wrap raw IV bytes.
    pub const fn new(bytes: [u8; BLOCK_LEN]) -> Self {
        Iv(bytes)
    }

    /// A fresh IV from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; BLOCK_LEN];
        rand::fill(&mut bytes);
        Iv(bytes)
    }

    /// The raw IV bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }
}

impl From<[u8; BLOCK_LEN]> for Iv {
    fn from(bytes: [u8; BLOCK_LEN]) -> Self {
        Iv(bytes)
    }
}

impl TryFrom<&[u8]> for Iv {
    type Error = KeyLengthError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        to_block("IV", value).map(Iv)
    }
}

/// The secrets needed to seal and open datagrams on one channel: the raw
/// passphrase (HMAC key) and the AES key.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    passphrase: Vec<u8>,
    key: SymmetricKey,
}

impl Credentials {
    /// Pair a passphrase with an explicitly provisioned key.
    pub fn new(passphrase: impl Into<Vec<u8>>, key: SymmetricKey) -> Self {
        Credentials {
            passphrase: passphrase.into(),
            key,
        }
    }

    /// Build credentials from a passphrase alone, deriving the AES key with
    /// [`SymmetricKey::derive_from_passphrase`].
    pub fn from_passphrase(passphrase: impl Into<Vec<u8>>) -> Self {
        let passphrase = passphrase.into();
        let key = SymmetricKey::derive_from_passphrase(&passphrase);
        Credentials { passphrase, key }
    }

    /// The HMAC key bytes.
    pub fn passphrase(&self) -> &[u8] {
        &self.passphrase
    }

    /// The AES key.
    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("passphrase", &"..")
            .field("key", &self.key)
            .finish()
    }
}

fn to_block(what: &'static str, value: &[u8]) -> Result<[u8; BLOCK_LEN], KeyLengthError> {
    value.try_into().map_err(|_| KeyLengthError {
        what,
        expected: BLOCK_LEN,
        actual: value.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_slice() {
        let key = SymmetricKey::try_from(&[7u8; 16][..]).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; 16]);
    }

    #[test]
    fn test_key_wrong_length() {
        let err = SymmetricKey::try_from(&[0u8; 15][..]).unwrap_err();
        assert_eq!(err.expected, 16);
        assert_eq!(err.actual, 15);
        assert_eq!(err.what, "key");
    }

    #[test]
    fn test_iv_wrong_length() {
        let err = Iv::try_from(&[0u8; 17][..]).unwrap_err();
        assert_eq!(err.what, "IV");
        assert_eq!(err.actual, 17);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = SymmetricKey::derive_from_passphrase(b"pw");
        let b = SymmetricKey::derive_from_passphrase(b"pw");
        let c = SymmetricKey::derive_from_passphrase(b"pw2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derivation_is_domain_separated() {
        // A bare SHA-256 of the passphrase must not be the derived key.
        let bare = Sha256::digest(b"pw");
        let derived = SymmetricKey::derive_from_passphrase(b"pw");
        assert_ne!(&bare[..16], &derived.as_bytes()[..]);
    }

    #[test]
    fn test_random_ivs_differ() {
        assert_ne!(Iv::random(), Iv::random());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::from_passphrase("secret");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"));
        assert_eq!(format!("{:?}", creds.key()), "SymmetricKey(..)");
    }

    #[test]
    fn test_credentials_from_passphrase() {
        let creds = Credentials::from_passphrase("pw");
        assert_eq!(creds.passphrase(), b"pw");
        assert_eq!(creds.key(), &SymmetricKey::derive_from_passphrase(b"pw"));
    }
}
