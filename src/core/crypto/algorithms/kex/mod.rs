/*!
Key exchange algorithm implementations.
*/

pub mod kyber;
pub mod x25519;

pub use kyber::{accelerated_supported, AcceleratedKyber, PortableKyber};

use crate::core::crypto::types::algorithms::PqKem;
use crate::core::error::{Error, Result};

pub(crate) fn check_public_key(kem: PqKem, public_key: &[u8]) -> Result<()> {
    if public_key.len() != kem.public_key_size() {
        return Err(Error::KeyLength {
            algorithm: kem.name(),
            expected: kem.public_key_size(),
            actual: public_key.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_ciphertext(kem: PqKem, ciphertext: &[u8]) -> Result<()> {
    if ciphertext.len() != kem.ciphertext_size() {
        return Err(Error::CiphertextLength {
            algorithm: kem.name(),
            expected: kem.ciphertext_size(),
            actual: ciphertext.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_secret_key(kem: PqKem, secret_key: &[u8]) -> Result<()> {
    if secret_key.len() != kem.secret_key_size() {
        return Err(Error::Reference("secret key does not match parameter set"));
    }
    Ok(())
}
