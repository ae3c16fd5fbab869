// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Time response datagrams.
//!
//! A time response is a Command datagram with Binary encoding and an empty
//! payload. The server's clock reading travels in the authenticated
//! timestamp field, and the source address is the address of the time
//! channel it answers on.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{decode, seal};
use crate::datagram::{Address, DatagramType, Encoding, PublicHeader, Version, split_public_prefix};
use crate::error::{DecodeError, EncodeError};
use crate::keys::{Credentials, Iv};

/// Build a time response carrying `timestamp`, sealed with a fresh random IV.
pub fn assemble_time(
    address: &Address,
    credentials: &Credentials,
    timestamp: i32,
) -> Result<Vec<u8>, EncodeError> {
    let header =
        PublicHeader::header_bytes(DatagramType::Command, Version::CURRENT, Encoding::Binary);
    seal(
        header,
        address,
        credentials.passphrase(),
        credentials.key(),
        &Iv::random(),
        timestamp,
        &[],
    )
}

/// Verify a time response and return the timestamp it carries.
///
/// Rejects anything that is not a Command datagram from `address`, in
/// addition to every check [`decode`] performs. As with `decode`, all
/// failures are the same [`DecodeError`].
pub fn disassemble_time(
    datagram: &[u8],
    address: &Address,
    credentials: &Credentials,
) -> Result<i32, DecodeError> {
    let (header, _) = split_public_prefix(datagram).map_err(|_| DecodeError)?;
    if header.kind != DatagramType::Command || header.source_address != address.as_str() {
        return Err(DecodeError);
    }
    let decoded = decode(datagram, credentials.passphrase(), credentials.key())?;
    Ok(decoded.timestamp)
}

/// Current wall-clock time as whole seconds since the Unix epoch.
///
/// Saturates at the `i32` range, which is what the wire format can carry.
pub fn unix_timestamp_now() -> i32 {
    let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    };
    secs.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::datagram::parse_public_header;

    fn setup() -> (Address, Credentials) {
        (Address::new("hub").unwrap(), Credentials::from_passphrase("pw"))
    }

    #[test]
    fn test_time_roundtrip() {
        let (address, creds) = setup();
        let datagram = assemble_time(&address, &creds, 1_700_000_000).unwrap();
        assert_eq!(disassemble_time(&datagram, &address, &creds), Ok(1_700_000_000));
    }

    #[test]
    fn test_time_header() {
        let (address, creds) = setup();
        let datagram = assemble_time(&address, &creds, 5).unwrap();
        let header = parse_public_header(&datagram).unwrap();
        assert_eq!(header.kind, DatagramType::Command);
        assert_eq!(header.encoding, Encoding::Binary);
        assert_eq!(header.source_address, "hub");
    }

    #[test]
    fn test_time_uses_fresh_ivs() {
        let (address, creds) = setup();
        let a = assemble_time(&address, &creds, 5).unwrap();
        let b = assemble_time(&address, &creds, 5).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_time_rejects_wrong_passphrase() {
        let (address, creds) = setup();
        let datagram = assemble_time(&address, &creds, 5).unwrap();
        let other = Credentials::from_passphrase("other");
        assert_eq!(disassemble_time(&datagram, &address, &other), Err(DecodeError));
    }

    #[test]
    fn test_time_rejects_other_address() {
        let (address, creds) = setup();
        let datagram = assemble_time(&address, &creds, 5).unwrap();
        let elsewhere = Address::new("hub2").unwrap();
        assert_eq!(disassemble_time(&datagram, &elsewhere, &creds), Err(DecodeError));
    }

    #[test]
    fn test_time_rejects_message_datagrams() {
        let (address, creds) = setup();
        let datagram = encode(
            &address,
            creds.passphrase(),
            creds.key(),
            &Iv::random(),
            5,
            Encoding::Binary,
            &[],
        )
        .unwrap();
        assert_eq!(disassemble_time(&datagram, &address, &creds), Err(DecodeError));
    }

    #[test]
    fn test_unix_timestamp_now_is_recent() {
        // 2023-11-14 or later.
        assert!(unix_timestamp_now() > 1_700_000_000);
    }
}
