//! DER builders for unit tests.

use crate::core::x509::der::tag;

pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = value.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(value);
    out
}

pub fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag::SEQUENCE, &parts.concat())
}

// 1.2.840.10045.4.3.2 (ecdsa-with-SHA256)
pub const ECDSA_SHA256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];
// 1.3.101.110 (X25519)
pub const X25519_OID: &[u8] = &[0x2B, 0x65, 0x6E];

pub fn name(cn: &str) -> Vec<u8> {
    let atv = seq(&[tlv(tag::OBJECT_IDENTIFIER, &[0x55, 0x04, 0x03]), tlv(0x0C, cn.as_bytes())]);
    seq(&[tlv(tag::SET, &atv)])
}

/// Certificate with the given version field and optional empty extensions
pub fn certificate(version: Option<u8>, extensions: bool, subject: &str) -> Vec<u8> {
    let alg = seq(&[tlv(tag::OBJECT_IDENTIFIER, ECDSA_SHA256)]);
    let mut tbs = Vec::new();
    if let Some(v) = version {
        tbs.push(tlv(tag::context(0, true), &tlv(tag::INTEGER, &[v])));
    }
    tbs.push(tlv(tag::INTEGER, &[0x01, 0x23]));
    tbs.push(alg.clone());
    tbs.push(name("issuer"));
    tbs.push(seq(&[
        tlv(tag::UTC_TIME, b"230101000000Z"),
        tlv(tag::GENERALIZED_TIME, b"20330101000000Z"),
    ]));
    tbs.push(name(subject));
    tbs.push(seq(&[
        seq(&[tlv(tag::OBJECT_IDENTIFIER, X25519_OID)]),
        tlv(tag::BIT_STRING, &[&[0x00][..], &[0x42; 32][..]].concat()),
    ]));
    if extensions {
        tbs.push(tlv(tag::context(3, true), &seq(&[])));
    }
    seq(&[seq(&tbs), alg, tlv(tag::BIT_STRING, &[0x00, 0xDE, 0xAD])])
}

/// A valid v3 certificate
pub fn leaf(subject: &str) -> Vec<u8> {
    certificate(Some(2), true, subject)
}
