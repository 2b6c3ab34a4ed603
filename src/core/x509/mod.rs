/*!
X.509 certificate decoding and chain assembly.
*/

pub mod certificate;
pub mod chain;
pub mod der;
pub mod provider;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use self::certificate::DerCertificate;
pub use self::chain::{parse_with_trailing_tolerance, parse_without_length_validation, CertificateChain, ChainPolicy};
pub use self::provider::{parse_certificate, CertificateProvider, DecodedCertificate, DerCertificateProvider, ParsedCertificate};
pub use self::time::{Asn1Time, Validity};
