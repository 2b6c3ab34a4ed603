/*!
Handshake message framing.

Each handshake message is:
- Message Type (1 byte)
- Body Length (3 bytes, big-endian)
- Body

A KeyExchange body is the 16-bit named-group id followed by the
length-prefixed public key (server to client) or ciphertext (client to
server).
*/

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::core::blob::Blob;
use crate::core::constants::{sizes, MAX_HANDSHAKE_MESSAGE_LEN};
use crate::core::crypto::types::algorithms::KemAlgorithm;
use crate::core::error::{Error, Result};

/// Handshake message types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeType {
    /// Certificate chain
    Certificate = 11,
    /// KEM public key or ciphertext
    KeyExchange = 12,
    /// Finished verify data
    Finished = 20,
}

impl HandshakeType {
    /// Convert a u8 value to a HandshakeType
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            11 => Some(HandshakeType::Certificate),
            12 => Some(HandshakeType::KeyExchange),
            20 => Some(HandshakeType::Finished),
            _ => None,
        }
    }

    /// Get the u8 value of this HandshakeType
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HandshakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeType::Certificate => write!(f, "Certificate"),
            HandshakeType::KeyExchange => write!(f, "KeyExchange"),
            HandshakeType::Finished => write!(f, "Finished"),
        }
    }
}

/// One framed handshake message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub msg_type: HandshakeType,
    pub body: Blob,
}

impl HandshakeMessage {
    pub fn new(msg_type: HandshakeType, body: impl Into<Blob>) -> Self {
        Self {
            msg_type,
            body: body.into(),
        }
    }

    /// KeyExchange message carrying a length-prefixed KEM value for `kem`
    pub fn key_exchange(kem: KemAlgorithm, prefixed_value: &[u8]) -> Self {
        let mut body = vec![0u8; 2];
        BigEndian::write_u16(&mut body, kem.group_id());
        body.extend_from_slice(prefixed_value);
        Self::new(HandshakeType::KeyExchange, body)
    }

    /// Split a KeyExchange body into the algorithm and the length-prefixed value
    pub fn parse_key_exchange(&self) -> Result<(KemAlgorithm, Blob)> {
        if self.body.size() < 2 {
            return Err(Error::Decode("KeyExchange body too short".into()));
        }
        let group_id = BigEndian::read_u16(&self.body.as_slice()[..2]);
        let kem = KemAlgorithm::from_group_id(group_id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("group 0x{:04x}", group_id)))?;
        Ok((kem, self.body.slice_from(2)?))
    }

    /// Encode header and body
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.body.size();
        if len > MAX_HANDSHAKE_MESSAGE_LEN {
            return Err(Error::Reference("handshake body exceeds 24-bit length"));
        }

        let mut bytes = Vec::with_capacity(sizes::HANDSHAKE_HEADER_SIZE + len);
        bytes.push(self.msg_type.as_u8());
        let mut length = [0u8; 3];
        BigEndian::write_u24(&mut length, len as u32);
        bytes.extend_from_slice(&length);
        bytes.extend_from_slice(self.body.as_slice());
        Ok(bytes)
    }

    /// Decode one message that fills `blob` exactly
    pub fn from_blob(blob: &Blob) -> Result<Self> {
        let bytes = blob.as_slice();
        if bytes.len() < sizes::HANDSHAKE_HEADER_SIZE {
            return Err(Error::Decode("handshake header too short".into()));
        }

        let msg_type = HandshakeType::from_u8(bytes[0])
            .ok_or_else(|| Error::Decode(format!("invalid handshake type: {}", bytes[0])))?;
        let declared = BigEndian::read_u24(&bytes[1..4]) as usize;
        let available = bytes.len() - sizes::HANDSHAKE_HEADER_SIZE;
        if declared != available {
            return Err(Error::Decode(format!(
                "{} body length {} does not match {} available bytes",
                msg_type, declared, available
            )));
        }

        Ok(Self {
            msg_type,
            body: blob.slice_from(sizes::HANDSHAKE_HEADER_SIZE)?,
        })
    }
}
