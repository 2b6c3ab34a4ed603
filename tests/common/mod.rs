//! Shared DER builders for integration tests.
#![allow(dead_code)]

const SEQUENCE: u8 = 0x30;
const SET: u8 = 0x31;
const INTEGER: u8 = 0x02;
const BIT_STRING: u8 = 0x03;
const OID: u8 = 0x06;
const UTF8_STRING: u8 = 0x0C;
const UTC_TIME: u8 = 0x17;
const GENERALIZED_TIME: u8 = 0x18;

// 1.2.840.10045.4.3.2 (ecdsa-with-SHA256)
const ECDSA_SHA256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];
// 1.3.101.110 (X25519)
const X25519: &[u8] = &[0x2B, 0x65, 0x6E];

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

fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(SEQUENCE, &parts.concat())
}

fn name(cn: &str) -> Vec<u8> {
    let atv = seq(&[tlv(OID, &[0x55, 0x04, 0x03]), tlv(UTF8_STRING, cn.as_bytes())]);
    seq(&[tlv(SET, &atv)])
}

/// A v3 certificate for `subject` issued by `issuer`
pub fn certificate(subject: &str, issuer: &str) -> Vec<u8> {
    let alg = seq(&[tlv(OID, ECDSA_SHA256)]);
    let tbs = seq(&[
        tlv(0xA0, &tlv(INTEGER, &[2])),
        tlv(INTEGER, &[0x0F, 0x42]),
        alg.clone(),
        name(issuer),
        seq(&[tlv(UTC_TIME, b"240101000000Z"), tlv(GENERALIZED_TIME, b"20340101000000Z")]),
        name(subject),
        seq(&[seq(&[tlv(OID, X25519)]), tlv(BIT_STRING, &[&[0x00][..], &[0x24; 32][..]].concat())]),
        tlv(0xA3, &seq(&[])),
    ]);
    seq(&[tbs, alg, tlv(BIT_STRING, &[0x00, 0xBE, 0xEF])])
}

/// Leaf, intermediate and root concatenated
pub fn chain(depth: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..depth {
        out.extend_from_slice(&certificate(&format!("cert-{}", i), &format!("cert-{}", i + 1)));
    }
    out
}
