/*!
Length-tagged byte buffers passed between the handshake layers.
*/

use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use crate::core::error::{Error, Result};

/// Immutable, cheaply cloneable view of a byte range.
///
/// The size is always the length of the backing range; nothing is inferred
/// from terminators. An empty blob is valid and means "no data".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
}

impl Blob {
    /// Take ownership of a buffer
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: Bytes::from(data) }
    }

    /// Copy bytes into a new blob
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self { data: Bytes::copy_from_slice(data) }
    }

    /// An empty blob
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of bytes in the blob
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Sub-range of this blob sharing the same backing buffer.
    ///
    /// A range outside the blob is a caller contract violation.
    pub fn slice(&self, range: Range<usize>) -> Result<Blob> {
        if range.start > range.end || range.end > self.data.len() {
            return Err(Error::Reference("blob range out of bounds"));
        }
        Ok(Self { data: self.data.slice(range) })
    }

    /// Everything from `offset` to the end
    pub fn slice_from(&self, offset: usize) -> Result<Blob> {
        self.slice(offset..self.data.len())
    }

    /// Copy the bytes into an owned vector
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Blob {
    fn from(data: &[u8]) -> Self {
        Self::copy_from_slice(data)
    }
}

impl From<Bytes> for Blob {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.data.len())
    }
}
