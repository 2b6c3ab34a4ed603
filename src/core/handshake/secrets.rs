/*!
Session secret derivation.

Secrets are expanded from the KEM shared secret with HKDF-SHA256. The
salt binds the exchange: SHA-256 over the key owner's public key followed
by the ciphertext.
*/

use std::fmt;

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::core::constants::{
    sizes::secrets::{FINISHED_SIZE, WRITE_KEY_SIZE},
    HKDF_INFO_CLIENT_FINISHED, HKDF_INFO_CLIENT_WRITE, HKDF_INFO_SERVER_FINISHED, HKDF_INFO_SERVER_WRITE,
    HKDF_LABEL_PREFIX,
};
use crate::core::crypto::key_exchange::SharedSecret;
use crate::core::error::{KeyExchangeError, Result};
use crate::core::handshake::state::Role;
use crate::key_exchange_err;

/// Keys and Finished values for one completed exchange
pub struct SessionSecrets {
    client_write_key: Zeroizing<[u8; WRITE_KEY_SIZE]>,
    server_write_key: Zeroizing<[u8; WRITE_KEY_SIZE]>,
    client_finished: Zeroizing<[u8; FINISHED_SIZE]>,
    server_finished: Zeroizing<[u8; FINISHED_SIZE]>,
}

impl SessionSecrets {
    /// Derive every secret from the shared secret and the exchanged values
    pub fn derive(shared_secret: &SharedSecret, public_key: &[u8], ciphertext: &[u8]) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(public_key);
        hasher.update(ciphertext);
        let salt = hasher.finalize();

        let hkdf = Hkdf::<Sha256>::new(Some(salt.as_slice()), shared_secret.as_bytes());

        Ok(Self {
            client_write_key: expand(&hkdf, HKDF_INFO_CLIENT_WRITE)?,
            server_write_key: expand(&hkdf, HKDF_INFO_SERVER_WRITE)?,
            client_finished: expand(&hkdf, HKDF_INFO_CLIENT_FINISHED)?,
            server_finished: expand(&hkdf, HKDF_INFO_SERVER_FINISHED)?,
        })
    }

    pub fn client_write_key(&self) -> &[u8] {
        &self.client_write_key[..]
    }

    pub fn server_write_key(&self) -> &[u8] {
        &self.server_write_key[..]
    }

    /// Finished value sent by `role`
    pub fn finished(&self, role: Role) -> &[u8] {
        match role {
            Role::Client => &self.client_finished[..],
            Role::Server => &self.server_finished[..],
        }
    }

    /// Check a Finished value claimed to come from `role` (constant time)
    pub fn verify_finished(&self, role: Role, received: &[u8]) -> bool {
        let expected = self.finished(role);
        expected.len() == received.len() && bool::from(expected.ct_eq(received))
    }
}

fn expand<const N: usize>(hkdf: &Hkdf<Sha256>, info: &[u8]) -> Result<Zeroizing<[u8; N]>> {
    let mut label = Vec::with_capacity(HKDF_LABEL_PREFIX.len() + info.len());
    label.extend_from_slice(HKDF_LABEL_PREFIX);
    label.extend_from_slice(info);

    let mut okm = Zeroizing::new([0u8; N]);
    if hkdf.expand(&label, &mut okm[..]).is_err() {
        return key_exchange_err!(KeyExchangeError::KeyDerivationFailed);
    }
    Ok(okm)
}

impl fmt::Debug for SessionSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSecrets").finish_non_exhaustive()
    }
}
