//! Core components for the handshake.
//!
//! This module contains the building blocks of session establishment:
//! certificate decoding, key exchange, handshake control and error
//! handling.

// Immutable byte views
pub mod blob;

// Protocol constants
pub mod constants;

// Key exchange primitives and code path selection
pub mod crypto;

// Error handling
pub mod error;

// Handshake framing and state machine
pub mod handshake;

// Certificate decoding and chain assembly
pub mod x509;

// Re-exports for convenience
pub use self::blob::Blob;
pub use self::constants::VERSION;
pub use self::error::{CertificateError, Error, ErrorKind, KeyExchangeError, Result};
pub use self::handshake::{HandshakeConfig, HandshakeMachine, HandshakeState, Role};
