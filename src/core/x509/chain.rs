/*!
Certificate chain assembly.

A Certificate message body is one or more DER certificates back to back,
leaf first. Intermediates are parsed without looking at what follows
them; only the final certificate has its leftover bytes checked against
the trailing-byte tolerance in [`ChainPolicy`].

A chain is all or nothing. On any error every certificate decoded so far
is dropped before the error is returned.
*/

use crate::core::blob::Blob;
use crate::core::constants::{MAX_ALLOWED_CERT_TRAILING_BYTES, MAX_CHAIN_LENGTH};
use crate::core::error::{CertificateError, Error, Result};
use crate::core::x509::provider::{parse_certificate, CertificateProvider, DecodedCertificate, ParsedCertificate};
use crate::cert_err;

/// Limits applied while assembling a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainPolicy {
    /// Bytes tolerated after the final certificate
    pub max_trailing_bytes: usize,
    /// Maximum number of certificates in one chain
    pub max_chain_length: usize,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            max_trailing_bytes: MAX_ALLOWED_CERT_TRAILING_BYTES,
            max_chain_length: MAX_CHAIN_LENGTH,
        }
    }
}

/// Parse one certificate, leaving any following bytes for the caller to account for
pub fn parse_without_length_validation(
    blob: &Blob,
    provider: &dyn CertificateProvider,
) -> Result<ParsedCertificate> {
    parse_certificate(blob, provider)
}

/// Parse one certificate that must be the last thing in `blob`, give or take
/// `max_trailing_bytes`
pub fn parse_with_trailing_tolerance(
    blob: &Blob,
    provider: &dyn CertificateProvider,
    max_trailing_bytes: usize,
) -> Result<ParsedCertificate> {
    let parsed = parse_certificate(blob, provider)?;
    check_trailing(blob.size() - parsed.consumed_length(), max_trailing_bytes)?;
    Ok(parsed)
}

fn check_trailing(trailing: usize, allowed: usize) -> Result<()> {
    if trailing > allowed {
        log::warn!("Rejecting certificate with {} trailing bytes (allowed {})", trailing, allowed);
        return cert_err!(CertificateError::TooManyTrailingBytes { trailing, allowed });
    }
    Ok(())
}

/// An ordered, fully decoded certificate chain (leaf first)
#[derive(Debug)]
pub struct CertificateChain {
    certificates: Vec<ParsedCertificate>,
    trailing_bytes: usize,
}

impl CertificateChain {
    /// Decode every certificate in `blob`.
    ///
    /// Each certificate is parsed at the offset where the previous one ended.
    /// When the remaining bytes no longer start a certificate, the previous
    /// one was the last; it is parsed again with the trailing-byte tolerance,
    /// so a remainder larger than the policy allows is `TooManyTrailingBytes`.
    pub fn assemble(blob: &Blob, provider: &dyn CertificateProvider, policy: &ChainPolicy) -> Result<Self> {
        if blob.is_empty() {
            return cert_err!(CertificateError::EmptyChain);
        }

        let mut certificates = Vec::new();
        let mut offset = 0;
        let mut last_offset = 0;

        while offset < blob.size() {
            let rest = blob.slice_from(offset)?;
            match parse_without_length_validation(&rest, provider) {
                Ok(parsed) => {
                    if certificates.len() == policy.max_chain_length {
                        log::warn!("Certificate chain exceeds {} entries", policy.max_chain_length);
                        return cert_err!(CertificateError::ChainTooLong(policy.max_chain_length));
                    }
                    last_offset = offset;
                    offset += parsed.consumed_length();
                    certificates.push(parsed);
                }
                // A failure on the first certificate is a failure of the whole chain
                Err(err) if certificates.is_empty() => return Err(err),
                Err(Error::DecodeCertificate(err)) => {
                    log::debug!("{} bytes after certificate {} do not decode: {}", rest.size(), certificates.len(), err);
                    break;
                }
                Err(other) => return Err(other),
            }
        }

        // The final certificate must account for everything after it
        let tail = blob.slice_from(last_offset)?;
        let last = parse_with_trailing_tolerance(&tail, provider, policy.max_trailing_bytes)?;
        let trailing_bytes = tail.size() - last.consumed_length();
        certificates.pop();
        certificates.push(last);

        log::debug!(
            "Assembled certificate chain: {} certificates, {} trailing bytes",
            certificates.len(),
            trailing_bytes
        );
        Ok(Self { certificates, trailing_bytes })
    }

    /// The end-entity certificate
    pub fn leaf(&self) -> &dyn DecodedCertificate {
        // assemble never yields an empty chain
        self.certificates[0].certificate()
    }

    /// Certificates in wire order
    pub fn iter(&self) -> impl Iterator<Item = &dyn DecodedCertificate> + '_ {
        self.certificates.iter().map(ParsedCertificate::certificate)
    }

    /// Parsed entries with their consumed lengths
    pub fn entries(&self) -> &[ParsedCertificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Bytes covered by certificates
    pub fn total_consumed(&self) -> usize {
        self.certificates.iter().map(ParsedCertificate::consumed_length).sum()
    }

    /// Tolerated bytes after the final certificate
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    /// Free every certificate and consume the chain.
    ///
    /// Returns how many certificates were released.
    pub fn release(mut self) -> usize {
        self.clear()
    }

    fn clear(&mut self) -> usize {
        let released = self.certificates.len();
        self.certificates.clear();
        self.trailing_bytes = 0;
        released
    }
}

impl Drop for CertificateChain {
    fn drop(&mut self) {
        let released = self.clear();
        if released > 0 {
            log::debug!("Released certificate chain of {} certificates", released);
        }
    }
}
