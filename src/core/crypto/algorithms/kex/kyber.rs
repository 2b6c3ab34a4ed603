/*!
CRYSTALS-Kyber backends.

Two implementations of the same KEM:

- [`PortableKyber`] calls the PQClean reference ("clean") code directly
  through the bindings in `pqcrypto_kyber::ffi`, so it never takes a
  SIMD path regardless of the CPU.
- [`AcceleratedKyber`] goes through the public `pqcrypto_kyber` API,
  which dispatches to the AVX2 or NEON code when the CPU supports it.

Both validate lengths before touching the primitive, so they reject
exactly the same inputs.
*/

use pqcrypto_kyber::{ffi, kyber512, kyber768, kyber1024};
use pqcrypto_traits::kem::{Ciphertext, PublicKey, SecretKey, SharedSecret};
use zeroize::Zeroizing;

use crate::core::crypto::algorithms::kex::{check_ciphertext, check_public_key, check_secret_key};
use crate::core::crypto::traits::kex::{CodePath, KemBackend};
use crate::core::crypto::types::algorithms::PqKem;
use crate::core::error::{KeyExchangeError, Result};
use crate::key_exchange_err;

/// Whether this CPU can run the accelerated Kyber code.
///
/// Mirrors the dispatch inside `pqcrypto_kyber`: the AVX2 code is only
/// built for x86_64 outside macOS and Windows and is selected on `avx2`
/// alone.
pub fn accelerated_supported() -> bool {
    #[cfg(all(target_arch = "x86_64", not(any(target_os = "macos", target_os = "windows"))))]
    {
        std::arch::is_x86_feature_detected!("avx2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        std::arch::is_aarch64_feature_detected!("neon")
    }
    #[cfg(not(any(
        all(target_arch = "x86_64", not(any(target_os = "macos", target_os = "windows"))),
        target_arch = "aarch64"
    )))]
    {
        false
    }
}

/// Reference implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableKyber;

impl KemBackend for PortableKyber {
    fn path(&self) -> CodePath {
        CodePath::Portable
    }

    fn is_available(&self) -> bool {
        true
    }

    fn keypair(&self, kem: PqKem) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        let mut pk = vec![0u8; kem.public_key_size()];
        let mut sk = Zeroizing::new(vec![0u8; kem.secret_key_size()]);

        // SAFETY: buffers are sized to the parameter set's key lengths
        let rc = unsafe {
            match kem {
                PqKem::Kyber512 => ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_keypair(pk.as_mut_ptr(), sk.as_mut_ptr()),
                PqKem::Kyber768 => ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_keypair(pk.as_mut_ptr(), sk.as_mut_ptr()),
                PqKem::Kyber1024 => ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_keypair(pk.as_mut_ptr(), sk.as_mut_ptr()),
            }
        };
        if rc != 0 {
            return key_exchange_err!(KeyExchangeError::KeyGenerationFailed);
        }
        Ok((pk, sk))
    }

    fn encapsulate(&self, kem: PqKem, public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        check_public_key(kem, public_key)?;
        let mut ct = vec![0u8; kem.ciphertext_size()];
        let mut ss = Zeroizing::new(vec![0u8; kem.shared_secret_size()]);

        // SAFETY: public_key length checked above; output buffers sized per parameter set
        let rc = unsafe {
            match kem {
                PqKem::Kyber512 => {
                    ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_enc(ct.as_mut_ptr(), ss.as_mut_ptr(), public_key.as_ptr())
                }
                PqKem::Kyber768 => {
                    ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_enc(ct.as_mut_ptr(), ss.as_mut_ptr(), public_key.as_ptr())
                }
                PqKem::Kyber1024 => {
                    ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_enc(ct.as_mut_ptr(), ss.as_mut_ptr(), public_key.as_ptr())
                }
            }
        };
        if rc != 0 {
            return key_exchange_err!(KeyExchangeError::EncapsulationFailed);
        }
        Ok((ct, ss))
    }

    fn decapsulate(&self, kem: PqKem, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        check_ciphertext(kem, ciphertext)?;
        check_secret_key(kem, secret_key)?;
        let mut ss = Zeroizing::new(vec![0u8; kem.shared_secret_size()]);

        // SAFETY: input lengths checked above; output buffer sized per parameter set
        let rc = unsafe {
            match kem {
                PqKem::Kyber512 => {
                    ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_dec(ss.as_mut_ptr(), ciphertext.as_ptr(), secret_key.as_ptr())
                }
                PqKem::Kyber768 => {
                    ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_dec(ss.as_mut_ptr(), ciphertext.as_ptr(), secret_key.as_ptr())
                }
                PqKem::Kyber1024 => {
                    ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_dec(ss.as_mut_ptr(), ciphertext.as_ptr(), secret_key.as_ptr())
                }
            }
        };
        if rc != 0 {
            return key_exchange_err!(KeyExchangeError::DecapsulationFailed);
        }
        Ok(ss)
    }
}

/// Runtime-dispatched implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceleratedKyber;

macro_rules! kyber_keypair {
    ($params:ident) => {{
        let (pk, sk) = $params::keypair();
        (pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec()))
    }};
}

macro_rules! kyber_encapsulate {
    ($params:ident, $public_key:expr) => {{
        let pk = $params::PublicKey::from_bytes($public_key)
            .map_err(|_| crate::core::error::Error::Provider(KeyExchangeError::EncapsulationFailed))?;
        let (ss, ct) = $params::encapsulate(&pk);
        (ct.as_bytes().to_vec(), Zeroizing::new(ss.as_bytes().to_vec()))
    }};
}

macro_rules! kyber_decapsulate {
    ($params:ident, $ciphertext:expr, $secret_key:expr) => {{
        let ct = $params::Ciphertext::from_bytes($ciphertext)
            .map_err(|_| crate::core::error::Error::Provider(KeyExchangeError::DecapsulationFailed))?;
        let sk = $params::SecretKey::from_bytes($secret_key)
            .map_err(|_| crate::core::error::Error::Provider(KeyExchangeError::DecapsulationFailed))?;
        let ss = $params::decapsulate(&ct, &sk);
        Zeroizing::new(ss.as_bytes().to_vec())
    }};
}

impl KemBackend for AcceleratedKyber {
    fn path(&self) -> CodePath {
        CodePath::Accelerated
    }

    fn is_available(&self) -> bool {
        accelerated_supported()
    }

    fn keypair(&self, kem: PqKem) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        Ok(match kem {
            PqKem::Kyber512 => kyber_keypair!(kyber512),
            PqKem::Kyber768 => kyber_keypair!(kyber768),
            PqKem::Kyber1024 => kyber_keypair!(kyber1024),
        })
    }

    fn encapsulate(&self, kem: PqKem, public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        check_public_key(kem, public_key)?;
        Ok(match kem {
            PqKem::Kyber512 => kyber_encapsulate!(kyber512, public_key),
            PqKem::Kyber768 => kyber_encapsulate!(kyber768, public_key),
            PqKem::Kyber1024 => kyber_encapsulate!(kyber1024, public_key),
        })
    }

    fn decapsulate(&self, kem: PqKem, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        check_ciphertext(kem, ciphertext)?;
        check_secret_key(kem, secret_key)?;
        Ok(match kem {
            PqKem::Kyber512 => kyber_decapsulate!(kyber512, ciphertext, secret_key),
            PqKem::Kyber768 => kyber_decapsulate!(kyber768, ciphertext, secret_key),
            PqKem::Kyber1024 => kyber_decapsulate!(kyber1024, ciphertext, secret_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Error, ErrorKind};

    #[test]
    fn test_acceleration_matches_backend_build() {
        #[cfg(any(target_os = "macos", target_os = "windows"))]
        #[cfg(target_arch = "x86_64")]
        assert!(!accelerated_supported());

        #[cfg(all(target_arch = "x86_64", not(any(target_os = "macos", target_os = "windows"))))]
        assert_eq!(accelerated_supported(), std::arch::is_x86_feature_detected!("avx2"));

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        assert!(!accelerated_supported());

        assert_eq!(AcceleratedKyber.is_available(), accelerated_supported());
    }

    #[test]
    fn test_portable_round_trip() {
        for kem in PqKem::ALL {
            let backend = PortableKyber;
            let (pk, sk) = backend.keypair(kem).unwrap();
            assert_eq!(pk.len(), kem.public_key_size());
            assert_eq!(sk.len(), kem.secret_key_size());

            let (ct, ss) = backend.encapsulate(kem, &pk).unwrap();
            assert_eq!(ct.len(), kem.ciphertext_size());
            assert_eq!(backend.decapsulate(kem, &ct, &sk).unwrap(), ss);
        }
    }

    #[test]
    fn test_paths_interoperate() {
        let kem = PqKem::Kyber768;
        let (pk, sk) = PortableKyber.keypair(kem).unwrap();
        let (ct, ss) = AcceleratedKyber.encapsulate(kem, &pk).unwrap();
        assert_eq!(PortableKyber.decapsulate(kem, &ct, &sk).unwrap(), ss);

        let (pk, sk) = AcceleratedKyber.keypair(kem).unwrap();
        let (ct, ss) = PortableKyber.encapsulate(kem, &pk).unwrap();
        assert_eq!(AcceleratedKyber.decapsulate(kem, &ct, &sk).unwrap(), ss);
    }

    #[test]
    fn test_both_paths_reject_short_key() {
        let kem = PqKem::Kyber512;
        let short = vec![0u8; kem.public_key_size() - 1];
        for backend in [&PortableKyber as &dyn KemBackend, &AcceleratedKyber] {
            let err = backend.encapsulate(kem, &short).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::KeyLength);
        }
    }

    #[test]
    fn test_bad_ciphertext_length() {
        let kem = PqKem::Kyber1024;
        let (_, sk) = PortableKyber.keypair(kem).unwrap();
        let err = PortableKyber.decapsulate(kem, &[0u8; 10], &sk).unwrap_err();
        assert!(matches!(err, Error::CiphertextLength { expected: 1568, actual: 10, .. }));
    }
}
