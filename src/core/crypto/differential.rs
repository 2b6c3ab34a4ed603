/*!
Differential check of the KEM code paths.

Runs the receive-public-key and encapsulate sequence on the portable
path and, when the CPU supports it, again on the accelerated path. Both
runs must reach the same outcome. Encapsulation draws fresh randomness,
so shared secrets are compared through decapsulation instead, which is
deterministic: the same ciphertext under the same secret key must give
the same secret on either path.

Rejecting malformed input is a normal outcome. Only a disagreement
between paths is reported as an error.
*/

use crate::core::blob::Blob;
use crate::core::crypto::acceleration::KemEngine;
use crate::core::crypto::key_exchange::KemParams;
use crate::core::crypto::traits::kex::CodePath;
use crate::core::crypto::types::algorithms::{KemAlgorithm, PqKem};
use crate::core::error::{Error, ErrorKind, KeyExchangeError, Result};
use crate::key_exchange_err;

/// What one code path did with an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Key rejected before encapsulation
    Rejected(ErrorKind),
    /// Key accepted but encapsulation failed
    EncapsulationFailed(ErrorKind),
    /// Key accepted and encapsulated
    Accepted {
        public_key: Vec<u8>,
        consumed: usize,
        ciphertext_len: usize,
    },
}

impl PathOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PathOutcome::Accepted { .. })
    }
}

/// Summary of a differential run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferentialReport {
    pub kem: KemAlgorithm,
    /// Outcome shared by every path that ran
    pub outcome: PathOutcome,
    /// Whether the accelerated path ran as well
    pub accelerated_checked: bool,
    /// Whether shared secrets were cross-checked between paths
    pub secrets_checked: bool,
}

/// Run `buf` (a length-prefixed public key) through every available path
pub fn differential_recv_public_key(buf: &[u8], kem: KemAlgorithm, engine: &KemEngine) -> Result<DifferentialReport> {
    let blob = Blob::copy_from_slice(buf);

    let mut portable_engine = engine.clone();
    portable_engine.disable_accelerated();
    let portable = run_once(&blob, kem, portable_engine);

    let mut accelerated_engine = engine.clone();
    let mut accelerated_checked = false;
    if accelerated_engine.try_enable_accelerated() {
        let accelerated = run_once(&blob, kem, accelerated_engine);
        if accelerated != portable {
            log::error!(
                "{} paths disagree: portable {:?}, accelerated {:?}",
                kem,
                outcome_label(&portable),
                outcome_label(&accelerated)
            );
            return key_exchange_err!(KeyExchangeError::PathMismatch);
        }
        accelerated_checked = true;
    }

    let secrets_checked = match kem.pq_component() {
        Some(pq) if accelerated_checked => {
            cross_check_secrets(pq, buf, engine)?;
            true
        }
        _ => false,
    };

    Ok(DifferentialReport {
        kem,
        outcome: portable,
        accelerated_checked,
        secrets_checked,
    })
}

fn run_once(blob: &Blob, kem: KemAlgorithm, engine: KemEngine) -> PathOutcome {
    let mut params = KemParams::new(kem, engine);
    let (key, consumed) = match params.recv_public_key_from_wire(blob) {
        Ok(received) => received,
        Err(err) => return PathOutcome::Rejected(err.kind()),
    };
    let outcome = match params.encapsulate() {
        Ok(enc) => PathOutcome::Accepted {
            public_key: key.as_bytes().to_vec(),
            consumed,
            ciphertext_len: enc.ciphertext.len(),
        },
        Err(err) => PathOutcome::EncapsulationFailed(err.kind()),
    };
    params.release();
    outcome
}

/// Decapsulate the same ciphertexts on both paths under one key pair.
///
/// Uses `buf` itself as a ciphertext when it has the right length, plus one
/// freshly encapsulated on each path.
fn cross_check_secrets(kem: PqKem, buf: &[u8], engine: &KemEngine) -> Result<()> {
    let (Some(portable), Some(accelerated)) =
        (engine.backend_for(CodePath::Portable), engine.backend_for(CodePath::Accelerated))
    else {
        return Ok(());
    };

    let (public_key, secret_key) = portable.keypair(kem)?;

    let mut ciphertexts = Vec::with_capacity(3);
    if buf.len() == kem.ciphertext_size() {
        ciphertexts.push(buf.to_vec());
    }
    ciphertexts.push(portable.encapsulate(kem, &public_key)?.0);
    ciphertexts.push(accelerated.encapsulate(kem, &public_key)?.0);

    for ciphertext in &ciphertexts {
        let a = portable.decapsulate(kem, ciphertext, &secret_key)?;
        let b = accelerated.decapsulate(kem, ciphertext, &secret_key)?;
        if a != b {
            log::error!("{} decapsulation differs between code paths", kem.name());
            return Err(Error::Provider(KeyExchangeError::PathMismatch));
        }
    }
    Ok(())
}

fn outcome_label(outcome: &PathOutcome) -> String {
    match outcome {
        PathOutcome::Rejected(kind) => format!("rejected ({})", kind),
        PathOutcome::EncapsulationFailed(kind) => format!("encapsulation failed ({})", kind),
        PathOutcome::Accepted { consumed, .. } => format!("accepted ({} bytes)", consumed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::acceleration::AccelerationConfig;
    use crate::core::crypto::types::algorithms::ClassicalKem;

    fn wire(key: &[u8]) -> Vec<u8> {
        let mut out = (key.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(key);
        out
    }

    #[test]
    fn test_valid_key_accepted_on_all_paths() {
        let kem = KemAlgorithm::PostQuantum(PqKem::Kyber768);
        let engine = KemEngine::new(AccelerationConfig::default());
        let mut server = KemParams::new(kem, engine.clone());
        let key = server.generate_keypair().unwrap();

        let report = differential_recv_public_key(&wire(key.as_bytes()), kem, &engine).unwrap();
        assert!(report.outcome.is_accepted());
        assert_eq!(report.accelerated_checked, engine.accelerated_available());
        assert_eq!(report.secrets_checked, engine.accelerated_available());
    }

    #[test]
    fn test_short_key_rejected_on_all_paths() {
        for kem in KemAlgorithm::ALL {
            let engine = KemEngine::default();
            let short = vec![0x11u8; kem.public_key_size() - 1];
            let report = differential_recv_public_key(&wire(&short), kem, &engine).unwrap();
            assert_eq!(report.outcome, PathOutcome::Rejected(ErrorKind::KeyLength));
        }
    }

    #[test]
    fn test_garbage_inputs_never_mismatch() {
        let engine = KemEngine::default();
        let kem = KemAlgorithm::PostQuantum(PqKem::Kyber512);
        let inputs: Vec<Vec<u8>> = vec![
            vec![],
            vec![0x03],
            vec![0xFF, 0xFF, 0x00],
            wire(&vec![0xA5; kem.public_key_size()]),
            vec![0x5A; kem.ciphertext_size()],
        ];
        for input in inputs {
            assert!(differential_recv_public_key(&input, kem, &engine).is_ok());
        }
    }

    #[test]
    fn test_low_order_x25519_point() {
        let kem = KemAlgorithm::Classical(ClassicalKem::X25519);
        let report = differential_recv_public_key(&wire(&[0u8; 32]), kem, &KemEngine::default()).unwrap();
        assert_eq!(report.outcome, PathOutcome::EncapsulationFailed(ErrorKind::Provider));
        assert!(!report.secrets_checked);
    }
}
