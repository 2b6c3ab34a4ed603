/*!
X.509 certificate decoding.

Decodes exactly one `Certificate ::= SEQUENCE { tbsCertificate,
signatureAlgorithm, signatureValue }` from the front of a buffer and
reports how many bytes it occupied. Anything after the outer SEQUENCE
is left for the caller to account for.
*/

use crate::core::error::CertificateError;
use crate::core::x509::der::{self, tag, DerReader, DerResult};
use crate::core::x509::time::{Asn1Time, Validity};

/// A decoded certificate with the fields the handshake needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerCertificate {
    der: Vec<u8>,
    version: u8,
    serial_number: Vec<u8>,
    signature_algorithm: String,
    issuer: Vec<u8>,
    subject: Vec<u8>,
    validity: Validity,
    public_key_algorithm: String,
    public_key: Vec<u8>,
    has_extensions: bool,
}

impl DerCertificate {
    /// Decode one certificate from the start of `data`.
    ///
    /// Returns the certificate and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> DerResult<(Self, usize)> {
        let outer = der::read_tlv(data)?;
        if outer.tag != tag::SEQUENCE {
            return Err(CertificateError::UnexpectedTag {
                expected: tag::SEQUENCE,
                found: outer.tag,
            });
        }
        let consumed = outer.encoded_len();

        let mut cert = DerReader::new(outer.value);
        let tbs = cert.read(tag::SEQUENCE)?;
        let outer_sig_alg = read_algorithm(&mut cert)?;
        let (_, _signature) = der::bit_string(cert.read(tag::BIT_STRING)?)?;
        cert.finish("certificate")?;

        let mut tbs = DerReader::new(tbs);

        let version = match tbs.read_optional(tag::context(0, true))? {
            Some(explicit) => {
                let mut inner = DerReader::new(explicit);
                let value = der::check_integer(inner.read(tag::INTEGER)?)?;
                inner.finish("version")?;
                match value {
                    [v @ 0..=2] => *v + 1,
                    _ => return Err(CertificateError::InvalidField("version")),
                }
            }
            None => 1,
        };

        let serial_number = der::check_integer(tbs.read(tag::INTEGER)?)?.to_vec();
        let signature_algorithm = read_algorithm(&mut tbs)?;
        if signature_algorithm != outer_sig_alg {
            return Err(CertificateError::InvalidField("signature algorithm"));
        }

        let issuer = tbs.read_raw(tag::SEQUENCE)?.to_vec();

        let mut validity = DerReader::new(tbs.read(tag::SEQUENCE)?);
        let not_before = Asn1Time::read(&mut validity)?;
        let not_after = Asn1Time::read(&mut validity)?;
        validity.finish("validity")?;

        let subject = tbs.read_raw(tag::SEQUENCE)?.to_vec();

        let mut spki = DerReader::new(tbs.read(tag::SEQUENCE)?);
        let public_key_algorithm = read_algorithm(&mut spki)?;
        let (unused, key_bits) = der::bit_string(spki.read(tag::BIT_STRING)?)?;
        if unused != 0 {
            return Err(CertificateError::InvalidField("subject public key"));
        }
        spki.finish("subject public key info")?;

        // issuerUniqueID [1] / subjectUniqueID [2]
        tbs.read_optional(tag::context(1, false))?;
        tbs.read_optional(tag::context(2, false))?;

        let has_extensions = match tbs.read_optional(tag::context(3, true))? {
            Some(explicit) => {
                if version != 3 {
                    return Err(CertificateError::InvalidField("extensions"));
                }
                let mut inner = DerReader::new(explicit);
                inner.read(tag::SEQUENCE)?;
                inner.finish("extensions")?;
                true
            }
            None => false,
        };
        tbs.finish("tbsCertificate")?;

        let cert = Self {
            der: data[..consumed].to_vec(),
            version,
            serial_number,
            signature_algorithm,
            issuer,
            subject,
            validity: Validity { not_before, not_after },
            public_key_algorithm,
            public_key: key_bits.to_vec(),
            has_extensions,
        };
        Ok((cert, consumed))
    }

    /// Exactly the bytes this certificate was decoded from
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// X.509 version (1, 2 or 3)
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Serial number content octets
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// Signature algorithm OID in dotted form
    pub fn signature_algorithm(&self) -> &str {
        &self.signature_algorithm
    }

    /// Issuer name, full DER encoding
    pub fn issuer_der(&self) -> &[u8] {
        &self.issuer
    }

    /// Subject name, full DER encoding
    pub fn subject_der(&self) -> &[u8] {
        &self.subject
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// Subject public key algorithm OID in dotted form
    pub fn public_key_algorithm(&self) -> &str {
        &self.public_key_algorithm
    }

    /// Subject public key bits
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn has_extensions(&self) -> bool {
        self.has_extensions
    }
}

/// Read an AlgorithmIdentifier and return its OID; parameters are skipped
fn read_algorithm(reader: &mut DerReader<'_>) -> DerResult<String> {
    let mut alg = DerReader::new(reader.read(tag::SEQUENCE)?);
    let oid = der::object_identifier(alg.read(tag::OBJECT_IDENTIFIER)?)?;
    if !alg.is_empty() {
        alg.read_any()?;
    }
    alg.finish("algorithm identifier")?;
    Ok(oid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::x509::testing::{certificate, name};

    #[test]
    fn test_decode_v3_certificate() {
        let der = certificate(Some(2), true, "subject");
        let (cert, consumed) = DerCertificate::decode(&der).unwrap();

        assert_eq!(consumed, der.len());
        assert_eq!(cert.der(), &der[..]);
        assert_eq!(cert.version(), 3);
        assert_eq!(cert.serial_number(), &[0x01, 0x23]);
        assert_eq!(cert.signature_algorithm(), "1.2.840.10045.4.3.2");
        assert_eq!(cert.public_key_algorithm(), "1.3.101.110");
        assert_eq!(cert.public_key(), &[0x42; 32]);
        assert!(cert.has_extensions());
        assert_eq!(cert.validity().not_before.year(), 2023);
        assert_eq!(cert.validity().not_after.year(), 2033);
        assert_eq!(cert.subject_der(), &name("subject")[..]);
        assert_eq!(cert.issuer_der(), &name("issuer")[..]);
    }

    #[test]
    fn test_decode_v1_without_version_field() {
        let der = certificate(None, false, "subject");
        let (cert, _) = DerCertificate::decode(&der).unwrap();
        assert_eq!(cert.version(), 1);
        assert!(!cert.has_extensions());
    }

    #[test]
    fn test_consumed_excludes_trailing_bytes() {
        let mut der = certificate(Some(2), false, "subject");
        let len = der.len();
        der.extend_from_slice(&[0xFF, 0xFF]);
        let (cert, consumed) = DerCertificate::decode(&der).unwrap();
        assert_eq!(consumed, len);
        assert_eq!(cert.der().len(), len);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(DerCertificate::decode(&[]).unwrap_err(), CertificateError::Empty);
        assert!(matches!(
            DerCertificate::decode(&[0x04, 0x00]),
            Err(CertificateError::UnexpectedTag { .. })
        ));

        let der = certificate(Some(2), true, "subject");
        assert_eq!(
            DerCertificate::decode(&der[..der.len() - 1]).unwrap_err(),
            CertificateError::Truncated
        );

        // extensions on a v1 certificate
        let der = certificate(None, true, "subject");
        assert_eq!(
            DerCertificate::decode(&der).unwrap_err(),
            CertificateError::InvalidField("extensions")
        );

        let der = certificate(Some(5), false, "subject");
        assert_eq!(
            DerCertificate::decode(&der).unwrap_err(),
            CertificateError::InvalidField("version")
        );
    }
}
