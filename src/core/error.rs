/*!
Error handling for the handshake core.

Every operation in the certificate, key exchange and handshake layers
returns a [`Result`]. Errors carry limited detail: enough for the caller
to pick an alert, never secret material.
*/

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for the handshake core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the handshake core
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was missing or out of range (caller contract violation)
    #[error("Reference error: {0}")]
    Reference(&'static str),

    /// Malformed, truncated or over-padded certificate data
    #[error("Certificate decode failed: {0}")]
    DecodeCertificate(#[source] CertificateError),

    /// KEM public key length does not match the negotiated algorithm
    #[error("Invalid public key length for {algorithm}: expected {expected}, got {actual}")]
    KeyLength {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    /// KEM ciphertext length does not match the negotiated algorithm
    #[error("Invalid ciphertext length for {algorithm}: expected {expected}, got {actual}")]
    CiphertextLength {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The cryptographic backend failed (limited details for security)
    #[error("Key exchange failed")]
    Provider(#[source] KeyExchangeError),

    /// Algorithm is not known or not enabled
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No key exchange algorithm supported by both peers
    #[error("No mutually supported key exchange algorithm")]
    Negotiation,

    /// Malformed handshake framing
    #[error("Malformed handshake message: {0}")]
    Decode(String),

    /// Message type not acceptable in the current state
    #[error("Unexpected {message} message in state {state}")]
    UnexpectedMessage {
        message: String,
        state: String,
    },

    /// Operation requires a different handshake state
    #[error("Handshake not in correct state: expected {expected}, but was {actual}")]
    InvalidState {
        expected: String,
        actual: String,
    },

    /// Peer Finished value did not match the derived one
    #[error("Finished verification failed")]
    FinishedMismatch,

    /// The handshake already failed; no further messages are processed
    #[error("Handshake already failed")]
    HandshakeFailed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reasons a certificate (or chain) failed to decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// No bytes to decode
    #[error("empty input")]
    Empty,

    /// Input ended before the encoded structure did
    #[error("truncated encoding")]
    Truncated,

    /// Tag did not match the expected ASN.1 type
    #[error("unexpected tag: expected 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    /// High-tag-number form is not used by X.509
    #[error("unsupported tag 0x{0:02x}")]
    UnsupportedTag(u8),

    /// Indefinite length is forbidden in DER
    #[error("indefinite length")]
    IndefiniteLength,

    /// Length was not minimally encoded
    #[error("non-minimal length encoding")]
    NonMinimalLength,

    /// Length does not fit in the supported range
    #[error("length too large")]
    LengthOverflow,

    /// Bytes left over inside a constructed value
    #[error("unexpected data inside {0}")]
    TrailingData(&'static str),

    /// Field content is not valid for its type
    #[error("invalid {0}")]
    InvalidField(&'static str),

    /// Too many bytes after the final certificate
    #[error("{trailing} trailing bytes exceed the allowed {allowed}")]
    TooManyTrailingBytes { trailing: usize, allowed: usize },

    /// Chain contained no certificate
    #[error("empty certificate chain")]
    EmptyChain,

    /// Chain exceeded the configured length
    #[error("certificate chain longer than {0}")]
    ChainTooLong(usize),
}

/// Key exchange backend failures with limited details to prevent leaking information
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeError {
    /// Key generation failed
    #[error("Key generation failed")]
    KeyGenerationFailed,

    /// Key encapsulation failed
    #[error("Key encapsulation failed")]
    EncapsulationFailed,

    /// Key decapsulation failed
    #[error("Key decapsulation failed")]
    DecapsulationFailed,

    /// Public key produced a degenerate shared secret
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key derivation failed
    #[error("Key derivation failed")]
    KeyDerivationFailed,

    /// Portable and accelerated code paths disagreed
    #[error("Code paths disagree")]
    PathMismatch,
}

/// Coarse classification of errors for the connection layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller contract violation
    Reference,
    /// Certificate decoding failure
    DecodeCertificate,
    /// KEM public key or ciphertext length mismatch
    KeyLength,
    /// Cryptographic backend failure
    Provider,
    /// Handshake protocol violation
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Reference => write!(f, "ReferenceError"),
            ErrorKind::DecodeCertificate => write!(f, "DecodeCertificateError"),
            ErrorKind::KeyLength => write!(f, "KeyLengthError"),
            ErrorKind::Provider => write!(f, "ProviderError"),
            ErrorKind::Protocol => write!(f, "ProtocolError"),
        }
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Reference(_) => ErrorKind::Reference,
            Error::DecodeCertificate(_) => ErrorKind::DecodeCertificate,
            Error::KeyLength { .. } | Error::CiphertextLength { .. } => ErrorKind::KeyLength,
            Error::Provider(_) => ErrorKind::Provider,
            Error::UnsupportedAlgorithm(_)
            | Error::Negotiation
            | Error::Decode(_)
            | Error::UnexpectedMessage { .. }
            | Error::InvalidState { .. }
            | Error::FinishedMismatch
            | Error::HandshakeFailed
            | Error::Config(_) => ErrorKind::Protocol,
        }
    }
}

impl From<CertificateError> for Error {
    fn from(err: CertificateError) -> Self {
        Error::DecodeCertificate(err)
    }
}

impl From<KeyExchangeError> for Error {
    fn from(err: KeyExchangeError) -> Self {
        Error::Provider(err)
    }
}

/// Create a certificate decode error
#[macro_export]
macro_rules! cert_err {
    ($err:expr) => {
        Err($crate::core::error::Error::DecodeCertificate($err))
    };
}

/// Create a key exchange (provider) error
#[macro_export]
macro_rules! key_exchange_err {
    ($err:expr) => {
        Err($crate::core::error::Error::Provider($err))
    };
}

/// Create an invalid state error
#[macro_export]
macro_rules! invalid_state_err {
    ($expected:expr, $actual:expr) => {
        Err($crate::core::error::Error::InvalidState {
            expected: $expected.to_string(),
            actual: $actual.to_string(),
        })
    };
}

/// Convert from Error to io::Error (for record-layer integration)
impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        let kind = match error.kind() {
            ErrorKind::Reference => io::ErrorKind::InvalidInput,
            ErrorKind::DecodeCertificate | ErrorKind::KeyLength => io::ErrorKind::InvalidData,
            ErrorKind::Provider => io::ErrorKind::Other,
            ErrorKind::Protocol => io::ErrorKind::ConnectionAborted,
        };
        io::Error::new(kind, error.to_string())
    }
}
