/*!
X25519 used as a KEM.

Encapsulation generates an ephemeral scalar; the "ciphertext" is the
ephemeral public value and the shared secret is the Diffie-Hellman
output. An all-zero output means the peer sent a low-order point and is
rejected.
*/

use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::core::constants::sizes::x25519::{PUBLIC_KEY_BYTES, SECRET_KEY_BYTES};
use crate::core::error::{Error, KeyExchangeError, Result};
use crate::key_exchange_err;

const ALGORITHM: &str = "X25519";

/// Generate a key pair, returning (public key, secret key)
pub fn keypair() -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    let mut bytes = Zeroizing::new([0u8; SECRET_KEY_BYTES]);
    rand::rng().fill_bytes(&mut bytes[..]);
    let secret = StaticSecret::from(*bytes);
    let public = PublicKey::from(&secret);
    (public.as_bytes().to_vec(), Zeroizing::new(secret.as_bytes().to_vec()))
}

/// Encapsulate to `public_key`, returning (ciphertext, shared secret)
pub fn encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    let peer = public_key_array(public_key)?;
    let (ephemeral_public, ephemeral_secret) = keypair();
    let shared = diffie_hellman(&ephemeral_secret, peer)?;
    Ok((ephemeral_public, shared))
}

/// Recover the shared secret from the peer's ephemeral public value
pub fn decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let peer: [u8; PUBLIC_KEY_BYTES] = ciphertext.try_into().map_err(|_| Error::CiphertextLength {
        algorithm: ALGORITHM,
        expected: PUBLIC_KEY_BYTES,
        actual: ciphertext.len(),
    })?;
    diffie_hellman(secret_key, peer)
}

/// Check a received public value has the right length
pub fn public_key_array(public_key: &[u8]) -> Result<[u8; PUBLIC_KEY_BYTES]> {
    public_key.try_into().map_err(|_| Error::KeyLength {
        algorithm: ALGORITHM,
        expected: PUBLIC_KEY_BYTES,
        actual: public_key.len(),
    })
}

fn diffie_hellman(secret_key: &[u8], peer: [u8; PUBLIC_KEY_BYTES]) -> Result<Zeroizing<Vec<u8>>> {
    let bytes: Zeroizing<[u8; SECRET_KEY_BYTES]> = Zeroizing::new(
        secret_key
            .try_into()
            .map_err(|_| Error::Reference("X25519 secret key has wrong length"))?,
    );
    let secret = StaticSecret::from(*bytes);
    let shared = secret.diffie_hellman(&PublicKey::from(peer));
    if !shared.was_contributory() {
        return key_exchange_err!(KeyExchangeError::InvalidPublicKey);
    }
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}
