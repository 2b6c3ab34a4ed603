/*!
Strict DER reader.

Only the subset of DER that X.509 needs: single-byte tags, definite
minimal lengths, and constructed values that are exactly filled by
their children. Values are borrowed from the input, never copied.
*/

use crate::core::error::CertificateError;

/// Result type for DER decoding
pub type DerResult<T> = std::result::Result<T, CertificateError>;

/// Universal and context-specific tags used by X.509
pub mod tag {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const UTC_TIME: u8 = 0x17;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;

    /// Context-specific tag `[n]`
    pub const fn context(number: u8, constructed: bool) -> u8 {
        let form = if constructed { 0x20 } else { 0x00 };
        0x80 | form | (number & 0x1F)
    }
}

/// One decoded tag-length-value element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// Full identifier octet
    pub tag: u8,
    /// Bytes taken by tag and length octets
    pub header_len: usize,
    /// Content octets
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Total encoded size of the element
    pub fn encoded_len(&self) -> usize {
        self.header_len + self.value.len()
    }

    /// Whether the constructed bit is set
    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }
}

/// Decode the first element of `data`. Bytes after it are ignored.
pub fn read_tlv(data: &[u8]) -> DerResult<Tlv<'_>> {
    let (&tag, rest) = data.split_first().ok_or(CertificateError::Empty)?;
    if tag & 0x1F == 0x1F {
        return Err(CertificateError::UnsupportedTag(tag));
    }

    let (length, length_octets) = read_length(rest)?;
    let header_len = 1 + length_octets;
    let available = data.len() - header_len;
    if length > available {
        return Err(CertificateError::Truncated);
    }

    Ok(Tlv {
        tag,
        header_len,
        value: &data[header_len..header_len + length],
    })
}

/// Decode DER length octets, returning the length and how many octets encoded it
fn read_length(data: &[u8]) -> DerResult<(usize, usize)> {
    let (&first, rest) = data.split_first().ok_or(CertificateError::Truncated)?;

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let count = (first & 0x7F) as usize;
    match count {
        0 => return Err(CertificateError::IndefiniteLength),
        1..=4 => {}
        _ => return Err(CertificateError::LengthOverflow),
    }
    if rest.len() < count {
        return Err(CertificateError::Truncated);
    }

    let octets = &rest[..count];
    if octets[0] == 0 {
        return Err(CertificateError::NonMinimalLength);
    }

    let length = octets.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if length < 0x80 {
        return Err(CertificateError::NonMinimalLength);
    }

    Ok((length, 1 + count))
}

/// Sequential reader over the contents of a constructed value
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    /// Read the given content octets
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Whether every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Unconsumed bytes
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Tag of the next element without consuming it
    pub fn peek_tag(&self) -> Option<u8> {
        self.remaining().first().copied()
    }

    /// Read the next element of any type
    pub fn read_any(&mut self) -> DerResult<Tlv<'a>> {
        let tlv = read_tlv(self.remaining()).map_err(|err| match err {
            CertificateError::Empty => CertificateError::Truncated,
            other => other,
        })?;
        self.pos += tlv.encoded_len();
        Ok(tlv)
    }

    /// Read the next element, which must carry `expected`; returns its content
    pub fn read(&mut self, expected: u8) -> DerResult<&'a [u8]> {
        Ok(self.read_element(expected)?.value)
    }

    /// Read the next element, which must carry `expected`; returns its full encoding
    pub fn read_raw(&mut self, expected: u8) -> DerResult<&'a [u8]> {
        let start = self.pos;
        let tlv = self.read_element(expected)?;
        Ok(&self.data[start..start + tlv.encoded_len()])
    }

    /// Read the next element only if it carries `expected`
    pub fn read_optional(&mut self, expected: u8) -> DerResult<Option<&'a [u8]>> {
        if self.peek_tag() == Some(expected) {
            self.read(expected).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fail if any bytes remain inside the enclosing value
    pub fn finish(&self, context: &'static str) -> DerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CertificateError::TrailingData(context))
        }
    }

    fn read_element(&mut self, expected: u8) -> DerResult<Tlv<'a>> {
        match self.peek_tag() {
            None => Err(CertificateError::Truncated),
            Some(found) if found != expected => {
                Err(CertificateError::UnexpectedTag { expected, found })
            }
            Some(_) => self.read_any(),
        }
    }
}

/// Validate INTEGER content: non-empty and minimally encoded
pub fn check_integer(value: &[u8]) -> DerResult<&[u8]> {
    match value {
        [] => Err(CertificateError::InvalidField("integer")),
        [0x00, next, ..] if next & 0x80 == 0 => Err(CertificateError::InvalidField("integer")),
        [0xFF, next, ..] if next & 0x80 != 0 => Err(CertificateError::InvalidField("integer")),
        _ => Ok(value),
    }
}

/// Split BIT STRING content into unused-bit count and bit bytes
pub fn bit_string(value: &[u8]) -> DerResult<(u8, &[u8])> {
    let (&unused, bits) = value
        .split_first()
        .ok_or(CertificateError::InvalidField("bit string"))?;
    if unused > 7 || (bits.is_empty() && unused != 0) {
        return Err(CertificateError::InvalidField("bit string"));
    }
    Ok((unused, bits))
}

/// Decode OBJECT IDENTIFIER content into dotted-decimal form
pub fn object_identifier(value: &[u8]) -> DerResult<String> {
    const INVALID: CertificateError = CertificateError::InvalidField("object identifier");

    if value.is_empty() || value[value.len() - 1] & 0x80 != 0 {
        return Err(INVALID);
    }

    let mut arcs: Vec<u64> = Vec::new();
    let mut current: u64 = 0;
    let mut arc_start = true;
    for &byte in value {
        if arc_start && byte == 0x80 {
            return Err(INVALID);
        }
        if current > (u64::MAX >> 7) {
            return Err(INVALID);
        }
        current = (current << 7) | u64::from(byte & 0x7F);
        arc_start = byte & 0x80 == 0;
        if arc_start {
            arcs.push(current);
            current = 0;
        }
    }

    let first = arcs[0];
    let (a, b) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };

    let mut dotted = format!("{}.{}", a, b);
    for arc in &arcs[1..] {
        dotted.push('.');
        dotted.push_str(&arc.to_string());
    }
    Ok(dotted)
}
