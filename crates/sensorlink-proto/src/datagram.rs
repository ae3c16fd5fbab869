// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Wire-level datagram types and the cleartext public header.
//!
//! Every datagram starts with a 3-byte header and a length-prefixed source
//! address, both readable without any secret:
//!
//! ```text
//!  offset  size     field
//!  0       1        type: 'M' (Message) | 'C' (Command)
//!  1       1        version: ASCII digit, only '0' is accepted
//!  2       1        encoding: 'B' (Binary) | 'J' (JSON)
//!  3       1        address length
//!  4       addrLen  source address
//! ```
//!
//! The same bytes are repeated inside the ciphertext; see [`crate::codec`].

use core::fmt;

use crate::error::{AddressError, HeaderError};

/// Size of the fixed `type | version | encoding` header.
pub const HEADER_LEN: usize = 3;

/// Largest source address the one-byte length prefix can describe.
pub const MAX_ADDRESS_LEN: usize = u8::MAX as usize;

/// Kind of datagram, carried in the first header byte.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DatagramType {
    /// Application data (sensor readings and the like).
    Message,
    /// Protocol control traffic, such as time responses.
    Command,
}

impl DatagramType {
    /// The wire tag for this type.
    pub const fn tag(self) -> u8 {
        match self {
            DatagramType::Message => b'M',
            DatagramType::Command => b'C',
        }
    }

    /// Look up a type by its wire tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'M' => Some(DatagramType::Message),
            b'C' => Some(DatagramType::Command),
            _ => None,
        }
    }
}

/// Encoding of the application payload. Opaque to the codec.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Encoding {
    /// Raw bytes.
    #[default]
    Binary,
    /// UTF-8 JSON text.
    Json,
}

impl Encoding {
    /// The wire tag for this encoding.
    pub const fn tag(self) -> u8 {
        match self {
            Encoding::Binary => b'B',
            Encoding::Json => b'J',
        }
    }

    /// Look up an encoding by its wire tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'B' => Some(Encoding::Binary),
            b'J' => Some(Encoding::Json),
            _ => None,
        }
    }
}

/// Protocol version, serialized as a single ASCII digit.
///
/// Only single digits are representable; [`Version::new`] refuses anything
/// above 9 so the header byte is always well formed.
///
/// Encoding always emits [`Version::CURRENT`], and
/// [`parse_public_header`] rejects every other version with
/// [`HeaderError::UnsupportedVersion`]. Other values exist only to name
/// and compare versions seen on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(u8);

impl Version {
    /// The only version decoders currently accept.
    pub const CURRENT: Version = Version(0);

    /// Create a version, or `None` if it does not fit in one ASCII digit.
    pub const fn new(version: u8) -> Option<Self> {
        if version <= 9 {
            Some(Version(version))
        } else {
            None
        }
    }

    /// The numeric version.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The ASCII digit written on the wire.
    pub const fn tag(self) -> u8 {
        b'0' + self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source address known to fit in the one-byte length prefix.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an address.
    pub fn new(address: impl Into<String>) -> Result<Self, AddressError> {
        let address = address.into();
        if address.len() > MAX_ADDRESS_LEN {
            return Err(AddressError { len: address.len() });
        }
        Ok(Address(address))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address bytes as they appear on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes (always `<= 255`).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the address is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::new(value)
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Address::new(value)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The parts of a datagram that are readable without any key.
///
/// Suitable for routing and filtering decisions only: nothing here has been
/// authenticated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicHeader {
    /// Datagram type.
    pub kind: DatagramType,
    /// Protocol version.
    pub version: Version,
    /// Payload encoding.
    pub encoding: Encoding,
    /// Cleartext source address. Not necessarily valid UTF-8 on hostile
    /// input, so invalid sequences are replaced.
    pub source_address: String,
}

impl PublicHeader {
    /// Serialize `type | version | encoding`.
    pub(crate) fn header_bytes(
        kind: DatagramType,
        version: Version,
        encoding: Encoding,
    ) -> [u8; HEADER_LEN] {
        [kind.tag(), version.tag(), encoding.tag()]
    }
}

/// Parse the cleartext header and source address of a datagram.
///
/// Never touches secret material and is safe to call on unauthenticated
/// input.
///
/// # Examples
///
/// ```
/// use sensorlink_proto::datagram::{parse_public_header, DatagramType, Encoding};
///
/// let header = parse_public_header(b"M0J\x04dev1").unwrap();
/// assert_eq!(header.kind, DatagramType::Message);
/// assert_eq!(header.encoding, Encoding::Json);
/// assert_eq!(header.source_address, "dev1");
/// ```
pub fn parse_public_header(datagram: &[u8]) -> Result<PublicHeader, HeaderError> {
    let (header, _) = split_public_prefix(datagram)?;
    Ok(header)
}

/// Parse the public header and return it together with the byte length of
/// the `header | addrLen | address` prefix.
pub(crate) fn split_public_prefix(datagram: &[u8]) -> Result<(PublicHeader, usize), HeaderError> {
    if datagram.len() < HEADER_LEN + 1 {
        return Err(HeaderError::TooShort {
            len: datagram.len(),
        });
    }

    let kind =
        DatagramType::from_tag(datagram[0]).ok_or(HeaderError::UnknownType(datagram[0]))?;
    if datagram[1] != Version::CURRENT.tag() {
        return Err(HeaderError::UnsupportedVersion(datagram[1]));
    }
    let encoding =
        Encoding::from_tag(datagram[2]).ok_or(HeaderError::UnknownEncoding(datagram[2]))?;

    let declared = datagram[HEADER_LEN] as usize;
    let available = datagram.len() - (HEADER_LEN + 1);
    if declared > available {
        return Err(HeaderError::AddressOverflow {
            declared,
            available,
        });
    }
    let prefix_len = HEADER_LEN + 1 + declared;
    let source_address =
        String::from_utf8_lossy(&datagram[HEADER_LEN + 1..prefix_len]).into_owned();

    Ok((
        PublicHeader {
            kind,
            version: Version::CURRENT,
            encoding,
            source_address,
        },
        prefix_len,
    ))
}
