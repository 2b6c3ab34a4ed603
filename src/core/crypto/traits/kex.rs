/*!
Traits for key exchange backends.

A backend implements the post-quantum KEM primitive for one code path.
The portable reference path and the accelerated path implement the same
trait and must be observably identical.
*/

use std::fmt;

use zeroize::Zeroizing;

use crate::core::crypto::types::algorithms::PqKem;
use crate::core::error::Result;

/// Which implementation of a primitive is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePath {
    /// Reference C implementation, available everywhere
    Portable,
    /// Runtime-dispatched SIMD implementation
    Accelerated,
}

impl fmt::Display for CodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePath::Portable => write!(f, "portable"),
            CodePath::Accelerated => write!(f, "accelerated"),
        }
    }
}

/// Trait for KEM backend operations
pub trait KemBackend: Send + Sync {
    /// Code path this backend runs on
    fn path(&self) -> CodePath;

    /// Whether the backend can run on this machine
    fn is_available(&self) -> bool;

    /// Generate a key pair, returning (public key, secret key)
    fn keypair(&self, kem: PqKem) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Encapsulate to `public_key`, returning (ciphertext, shared secret)
    fn encapsulate(&self, kem: PqKem, public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Recover the shared secret from `ciphertext`
    fn decapsulate(&self, kem: PqKem, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}
