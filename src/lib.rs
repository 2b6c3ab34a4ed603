/*!
# PQC Handshake

The secure session establishment core of a TLS-style protocol with
post-quantum key exchange.

## Overview

This library provides:

- DER decoding of X.509 certificates through a pluggable provider
- Certificate chain assembly with a bounded allowance for trailing bytes
- CRYSTALS-Kyber, X25519 and hybrid X25519+Kyber768 key encapsulation
- Portable and CPU-accelerated Kyber paths with a differential check
- A handshake state machine that negotiates the KEM, validates the peer
  chain, derives session secrets and verifies Finished messages

## Example

```no_run
use pqc_handshake::{HandshakeConfig, HandshakeMachine, Role};

let config = HandshakeConfig::new(Role::Server);
let mut server = HandshakeMachine::new(config)?;
let outbound = server.start(&HandshakeConfig::default().kem_preferences)?;
assert_eq!(outbound.len(), 1);
# Ok::<(), pqc_handshake::Error>(())
```
*/

// Core handshake components
pub mod core;

// C entry points for fuzzing harnesses
#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types for convenience
pub use crate::core::blob::Blob;
pub use crate::core::constants::{MAX_ALLOWED_CERT_TRAILING_BYTES, MAX_CHAIN_LENGTH, VERSION, sizes};
pub use crate::core::crypto::{
    AccelerationConfig, CodePath, KemAlgorithm, KemEngine, KemParams, KemPublicKey, PqKem, SharedSecret,
    differential_recv_public_key,
};
pub use crate::core::error::{CertificateError, Error, ErrorKind, KeyExchangeError, Result};
pub use crate::core::handshake::{HandshakeConfig, HandshakeMachine, HandshakeMessage, HandshakeState, HandshakeType, Role, SessionSecrets};
pub use crate::core::x509::{CertificateChain, CertificateProvider, ChainPolicy, DerCertificateProvider};
