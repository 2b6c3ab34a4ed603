/*!
Certificate provider capability.

The chain layer never touches a concrete certificate type. It asks a
[`CertificateProvider`] to decode bytes and gets back a boxed
[`DecodedCertificate`] plus the consumed length, so any conformant
backend can be substituted.
*/

use std::fmt;

use crate::core::blob::Blob;
use crate::core::error::{Error, Result};
use crate::core::x509::certificate::DerCertificate;
use crate::core::x509::time::Validity;

/// Read-only view of a decoded certificate
pub trait DecodedCertificate: fmt::Debug + Send + Sync {
    /// Exactly the bytes the certificate was decoded from
    fn der(&self) -> &[u8];

    /// X.509 version (1, 2 or 3)
    fn version(&self) -> u8;

    /// Serial number content octets
    fn serial_number(&self) -> &[u8];

    /// Signature algorithm OID in dotted form
    fn signature_algorithm(&self) -> &str;

    /// Issuer name, full DER encoding
    fn issuer_der(&self) -> &[u8];

    /// Subject name, full DER encoding
    fn subject_der(&self) -> &[u8];

    /// Validity window, copied out of the certificate
    fn validity(&self) -> Validity;

    /// Subject public key algorithm OID in dotted form
    fn public_key_algorithm(&self) -> &str;

    /// Subject public key bits
    fn subject_public_key(&self) -> &[u8];
}

/// Backend able to decode one certificate from the front of a buffer
pub trait CertificateProvider: Send + Sync {
    /// Decode the first certificate in `data`, returning it and the bytes consumed
    fn decode(&self, data: &[u8]) -> Result<(Box<dyn DecodedCertificate>, usize)>;

    /// Name of this backend
    fn name(&self) -> &'static str;
}

impl DecodedCertificate for DerCertificate {
    fn der(&self) -> &[u8] {
        DerCertificate::der(self)
    }

    fn version(&self) -> u8 {
        DerCertificate::version(self)
    }

    fn serial_number(&self) -> &[u8] {
        DerCertificate::serial_number(self)
    }

    fn signature_algorithm(&self) -> &str {
        DerCertificate::signature_algorithm(self)
    }

    fn issuer_der(&self) -> &[u8] {
        DerCertificate::issuer_der(self)
    }

    fn subject_der(&self) -> &[u8] {
        DerCertificate::subject_der(self)
    }

    fn validity(&self) -> Validity {
        DerCertificate::validity(self)
    }

    fn public_key_algorithm(&self) -> &str {
        DerCertificate::public_key_algorithm(self)
    }

    fn subject_public_key(&self) -> &[u8] {
        DerCertificate::public_key(self)
    }
}

/// Built-in strict DER backend
#[derive(Debug, Clone, Copy, Default)]
pub struct DerCertificateProvider;

impl CertificateProvider for DerCertificateProvider {
    fn decode(&self, data: &[u8]) -> Result<(Box<dyn DecodedCertificate>, usize)> {
        let (cert, consumed) = DerCertificate::decode(data)?;
        Ok((Box::new(cert), consumed))
    }

    fn name(&self) -> &'static str {
        "der"
    }
}

/// A certificate together with the number of source bytes it occupied
#[derive(Debug)]
pub struct ParsedCertificate {
    certificate: Box<dyn DecodedCertificate>,
    consumed_length: usize,
}

impl ParsedCertificate {
    /// The decoded certificate
    pub fn certificate(&self) -> &dyn DecodedCertificate {
        self.certificate.as_ref()
    }

    /// Bytes read from the source blob
    pub fn consumed_length(&self) -> usize {
        self.consumed_length
    }
}

/// Decode exactly one certificate from the start of `blob`.
///
/// Bytes after the certificate are not examined.
pub fn parse_certificate(blob: &Blob, provider: &dyn CertificateProvider) -> Result<ParsedCertificate> {
    let (certificate, consumed_length) = provider.decode(blob.as_slice())?;

    if consumed_length == 0 || consumed_length > blob.size() {
        log::warn!(
            "Certificate provider {} reported {} consumed bytes for a {} byte blob",
            provider.name(),
            consumed_length,
            blob.size()
        );
        return Err(Error::Reference("provider consumed length out of range"));
    }

    Ok(ParsedCertificate { certificate, consumed_length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{CertificateError, ErrorKind};
    use crate::core::x509::testing;

    /// Claims to have read one byte more than it was given
    struct Overreaching;

    impl CertificateProvider for Overreaching {
        fn decode(&self, data: &[u8]) -> Result<(Box<dyn DecodedCertificate>, usize)> {
            let (cert, _) = DerCertificate::decode(&testing::leaf("x"))?;
            Ok((Box::new(cert), data.len() + 1))
        }

        fn name(&self) -> &'static str {
            "overreaching"
        }
    }

    #[test]
    fn test_parse_reports_consumed_length() {
        let der = testing::leaf("leaf");
        let mut bytes = der.clone();
        bytes.extend_from_slice(&[0, 0]);

        let parsed = parse_certificate(&Blob::new(bytes), &DerCertificateProvider).unwrap();
        assert_eq!(parsed.consumed_length(), der.len());
        assert_eq!(parsed.certificate().der(), &der[..]);
        assert_eq!(parsed.certificate().version(), 3);
    }

    #[test]
    fn test_empty_blob_is_decode_error() {
        let err = parse_certificate(&Blob::empty(), &DerCertificateProvider).unwrap_err();
        assert!(matches!(err, Error::DecodeCertificate(CertificateError::Empty)));
        assert_eq!(err.kind(), ErrorKind::DecodeCertificate);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let blob = Blob::new(vec![0x30, 0x03, 0x02, 0x01]);
        let err = parse_certificate(&blob, &DerCertificateProvider).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeCertificate);
    }

    #[test]
    fn test_provider_overreach_is_reference_error() {
        let err = parse_certificate(&Blob::new(vec![0x30, 0x00]), &Overreaching).unwrap_err();
        assert!(matches!(err, Error::Reference(_)));
    }
}
