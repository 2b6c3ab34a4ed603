/*!
Key exchange for the handshake.

This module provides the KEM algorithm identities, the portable and
accelerated backends, code path selection, and the per-handshake key
exchange state.
*/

// Backend implementations
pub mod algorithms;

// Code path selection
pub mod acceleration;

// Differential checking of code paths
pub mod differential;

// Per-handshake key exchange state
pub mod key_exchange;

pub mod traits;
pub mod types;

pub use acceleration::{AccelerationConfig, KemEngine};
pub use differential::{differential_recv_public_key, DifferentialReport, PathOutcome};
pub use key_exchange::{Encapsulation, KemParams, KemPublicKey, SharedSecret};
pub use traits::{CodePath, KemBackend};
pub use types::{ClassicalKem, HybridKem, KemAlgorithm, PqKem};
