// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Construction and verification of the authenticated, encrypted envelope.
//!
//! # Wire layout
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//!  size        field
//!  3           header: type | version | encoding
//!  1           addrLen
//!  addrLen     source address (cleartext)
//!  2           sectionLen
//!  16          IV                  \
//!  2           cipherLen            | authenticated section
//!  cipherLen   ciphertext          /
//!  32          HMAC-SHA-256(passphrase, authenticated section)
//! ```
//!
//! The ciphertext is AES-128-CBC over
//! `header | addrLen | address | timestamp (i32) | payload | PKCS#7 padding`.
//! Repeating the header and address inside the ciphertext lets the decoder
//! detect a valid ciphertext that was moved under a different cleartext
//! address.
//!
//! Decoding verifies the MAC before anything is decrypted.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::datagram::{
    Address, DatagramType, Encoding, HEADER_LEN, PublicHeader, Version, split_public_prefix,
};
use crate::error::{DecodeError, EncodeError};
use crate::keys::{BLOCK_LEN, Iv, SymmetricKey};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Length of the trailing HMAC-SHA-256 tag.
pub const MAC_LEN: usize = 32;

/// Size of the big-endian timestamp inside the plaintext.
pub const TIMESTAMP_LEN: usize = 4;

/// Largest authenticated section (IV, cipherLen field, ciphertext).
pub const MAX_SECTION_LEN: usize = u16::MAX as usize;

/// Size of each 16-bit length field.
const LEN_FIELD: usize = 2;

/// Timestamp and payload recovered from a verified datagram.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decoded {
    /// Seconds since the Unix epoch, as set by the sender.
    pub timestamp: i32,
    /// Application payload.
    pub payload: Vec<u8>,
}

/// Build a Message datagram.
///
/// `iv` must not have been used with `key` before. The only runtime failure
/// is [`EncodeError::PayloadTooLong`]: key, IV and address lengths are
/// guaranteed by their types.
///
/// # Examples
///
/// ```
/// use sensorlink_proto::codec::{decode, encode};
/// use sensorlink_proto::datagram::{Address, Encoding};
/// use sensorlink_proto::keys::{Iv, SymmetricKey};
///
/// let address = Address::new("dev1").unwrap();
/// let key = SymmetricKey::new([0u8; 16]);
/// let iv = Iv::new([0u8; 16]);
/// let datagram = encode(&address, b"pw", &key, &iv, 1000, Encoding::Binary, &[1, 2, 3]).unwrap();
///
/// let decoded = decode(&datagram, b"pw", &key).unwrap();
/// assert_eq!(decoded.timestamp, 1000);
/// assert_eq!(decoded.payload, vec![1, 2, 3]);
/// ```
pub fn encode(
    address: &Address,
    passphrase: &[u8],
    key: &SymmetricKey,
    iv: &Iv,
    timestamp: i32,
    encoding: Encoding,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let header = PublicHeader::header_bytes(DatagramType::Message, Version::CURRENT, encoding);
    seal(header, address, passphrase, key, iv, timestamp, payload)
}

/// Assemble a datagram with an arbitrary header.
pub(crate) fn seal(
    header: [u8; HEADER_LEN],
    address: &Address,
    passphrase: &[u8],
    key: &SymmetricKey,
    iv: &Iv,
    timestamp: i32,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let prefix = public_prefix(header, address);

    let mut plaintext = Vec::with_capacity(prefix.len() + TIMESTAMP_LEN + payload.len());
    plaintext.extend_from_slice(&prefix);
    plaintext.extend_from_slice(&timestamp.to_be_bytes());
    plaintext.extend_from_slice(payload);

    // PKCS#7 always pads, adding a whole block when already aligned.
    let ciphertext = Aes128CbcEnc::new(&(*key.as_bytes()).into(), &(*iv.as_bytes()).into())
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

    let section_len = BLOCK_LEN + LEN_FIELD + ciphertext.len();
    if section_len > MAX_SECTION_LEN {
        return Err(EncodeError::PayloadTooLong { section_len });
    }

    let mut section = Vec::with_capacity(section_len);
    section.extend_from_slice(iv.as_bytes());
    section.extend_from_slice(&(ciphertext.len() as u16).to_be_bytes());
    section.extend_from_slice(&ciphertext);

    let mut mac = keyed_mac(passphrase);
    mac.update(&section);
    let tag = mac.finalize().into_bytes();

    let mut datagram = Vec::with_capacity(prefix.len() + LEN_FIELD + section_len + MAC_LEN);
    datagram.extend_from_slice(&prefix);
    datagram.extend_from_slice(&(section_len as u16).to_be_bytes());
    datagram.extend_from_slice(&section);
    datagram.extend_from_slice(&tag);
    Ok(datagram)
}

/// Verify, decrypt, and unpack a datagram.
///
/// Every failure yields the same [`DecodeError`]. The ciphertext is only
/// decrypted once the MAC has been checked in constant time.
pub fn decode(
    datagram: &[u8],
    passphrase: &[u8],
    key: &SymmetricKey,
) -> Result<Decoded, DecodeError> {
    let (_, prefix_len) = split_public_prefix(datagram).map_err(|_| DecodeError)?;

    let section_start = prefix_len + LEN_FIELD;
    let section_len = read_be_u16(datagram, prefix_len).ok_or(DecodeError)? as usize;
    let section_end = section_start + section_len;
    if datagram.len() != section_end + MAC_LEN {
        return Err(DecodeError);
    }
    let section = &datagram[section_start..section_end];

    let mut mac = keyed_mac(passphrase);
    mac.update(section);
    mac.verify_slice(&datagram[section_end..]).map_err(|_| DecodeError)?;

    if section.len() < BLOCK_LEN + LEN_FIELD {
        return Err(DecodeError);
    }
    let iv = Iv::try_from(&section[..BLOCK_LEN]).map_err(|_| DecodeError)?;
    let cipher_len = read_be_u16(section, BLOCK_LEN).ok_or(DecodeError)? as usize;
    let ciphertext = &section[BLOCK_LEN + LEN_FIELD..];
    if ciphertext.len() != cipher_len || cipher_len == 0 || !cipher_len.is_multiple_of(BLOCK_LEN) {
        return Err(DecodeError);
    }

    let mut buf = ciphertext.to_vec();
    let plaintext = Aes128CbcDec::new(&(*key.as_bytes()).into(), &(*iv.as_bytes()).into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| DecodeError)?;

    // The encrypted copy of the header and address must match the cleartext one.
    let prefix = &datagram[..prefix_len];
    if plaintext.len() < prefix_len + TIMESTAMP_LEN || &plaintext[..prefix_len] != prefix {
        return Err(DecodeError);
    }

    let ts_end = prefix_len + TIMESTAMP_LEN;
    let mut ts = [0u8; TIMESTAMP_LEN];
    ts.copy_from_slice(&plaintext[prefix_len..ts_end]);

    Ok(Decoded {
        timestamp: i32::from_be_bytes(ts),
        payload: plaintext[ts_end..].to_vec(),
    })
}

/// HMAC-SHA-256 keyed with the raw passphrase.
///
/// HMAC hashes keys longer than the block and zero-pads shorter ones, so
/// every passphrase, including an empty one, is a valid key.
fn keyed_mac(passphrase: &[u8]) -> HmacSha256 {
    <HmacSha256 as KeyInit>::new_from_slice(passphrase).expect("HMAC can take key of any size")
}

/// `header | addrLen | address`, identical inside and outside the ciphertext.
fn public_prefix(header: [u8; HEADER_LEN], address: &Address) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(HEADER_LEN + 1 + address.len());
    prefix.extend_from_slice(&header);
    prefix.push(address.len() as u8);
    prefix.extend_from_slice(address.as_bytes());
    prefix
}

fn read_be_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + LEN_FIELD)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}
