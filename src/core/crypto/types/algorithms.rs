/*!
Key exchange algorithm identities.

A negotiated algorithm is one arm of a closed variant: classical,
post-quantum or hybrid. Every arm knows its own wire sizes, so length
checks never consult a lookup table.
*/

use std::fmt;

use crate::core::constants::sizes::{kyber, x25519};

/// Classical elliptic-curve key agreement, used as a KEM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassicalKem {
    /// X25519 ephemeral-static Diffie-Hellman
    X25519,
}

/// Post-quantum KEM parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum PqKem {
    /// CRYSTALS-Kyber KEM (Kyber512) - for resource-constrained environments
    Kyber512,
    /// CRYSTALS-Kyber KEM (Kyber768)
    Kyber768,
    /// CRYSTALS-Kyber KEM (Kyber1024) - highest security level
    Kyber1024,
}

/// Classical + post-quantum combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum HybridKem {
    /// X25519 followed by Kyber768; keys, ciphertexts and secrets are concatenated
    X25519Kyber768,
}

/// A negotiable key exchange algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum KemAlgorithm {
    Classical(ClassicalKem),
    PostQuantum(PqKem),
    Hybrid(HybridKem),
}

impl Default for KemAlgorithm {
    fn default() -> Self {
        KemAlgorithm::Hybrid(HybridKem::X25519Kyber768)
    }
}

impl PqKem {
    /// All parameter sets, weakest first
    pub const ALL: [PqKem; 3] = [PqKem::Kyber512, PqKem::Kyber768, PqKem::Kyber1024];

    pub fn name(&self) -> &'static str {
        match self {
            PqKem::Kyber512 => "Kyber512",
            PqKem::Kyber768 => "Kyber768",
            PqKem::Kyber1024 => "Kyber1024",
        }
    }

    pub fn public_key_size(&self) -> usize {
        match self {
            PqKem::Kyber512 => kyber::KYBER512_PUBLIC_KEY_BYTES,
            PqKem::Kyber768 => kyber::KYBER768_PUBLIC_KEY_BYTES,
            PqKem::Kyber1024 => kyber::KYBER1024_PUBLIC_KEY_BYTES,
        }
    }

    pub fn secret_key_size(&self) -> usize {
        match self {
            PqKem::Kyber512 => kyber::KYBER512_SECRET_KEY_BYTES,
            PqKem::Kyber768 => kyber::KYBER768_SECRET_KEY_BYTES,
            PqKem::Kyber1024 => kyber::KYBER1024_SECRET_KEY_BYTES,
        }
    }

    pub fn ciphertext_size(&self) -> usize {
        match self {
            PqKem::Kyber512 => kyber::KYBER512_CIPHERTEXT_BYTES,
            PqKem::Kyber768 => kyber::KYBER768_CIPHERTEXT_BYTES,
            PqKem::Kyber1024 => kyber::KYBER1024_CIPHERTEXT_BYTES,
        }
    }

    pub fn shared_secret_size(&self) -> usize {
        kyber::SHARED_SECRET_BYTES
    }
}

impl KemAlgorithm {
    /// Every supported algorithm
    pub const ALL: [KemAlgorithm; 5] = [
        KemAlgorithm::Classical(ClassicalKem::X25519),
        KemAlgorithm::PostQuantum(PqKem::Kyber512),
        KemAlgorithm::PostQuantum(PqKem::Kyber768),
        KemAlgorithm::PostQuantum(PqKem::Kyber1024),
        KemAlgorithm::Hybrid(HybridKem::X25519Kyber768),
    ];

    /// Get the name of the algorithm as a string
    pub fn name(&self) -> &'static str {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => "X25519",
            KemAlgorithm::PostQuantum(kem) => kem.name(),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => "X25519Kyber768",
        }
    }

    /// TLS named-group code point
    pub fn group_id(&self) -> u16 {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => 0x001D,
            KemAlgorithm::PostQuantum(PqKem::Kyber512) => 0x023A,
            KemAlgorithm::PostQuantum(PqKem::Kyber768) => 0x023C,
            KemAlgorithm::PostQuantum(PqKem::Kyber1024) => 0x023D,
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => 0x6399,
        }
    }

    /// Look up an algorithm by its named-group code point
    pub fn from_group_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kem| kem.group_id() == id)
    }

    /// The post-quantum component, if any
    pub fn pq_component(&self) -> Option<PqKem> {
        match self {
            KemAlgorithm::Classical(_) => None,
            KemAlgorithm::PostQuantum(kem) => Some(*kem),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => Some(PqKem::Kyber768),
        }
    }

    /// Whether the algorithm resists a quantum adversary
    pub fn is_post_quantum(&self) -> bool {
        self.pq_component().is_some()
    }

    pub fn public_key_size(&self) -> usize {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::PUBLIC_KEY_BYTES,
            KemAlgorithm::PostQuantum(kem) => kem.public_key_size(),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
                x25519::PUBLIC_KEY_BYTES + PqKem::Kyber768.public_key_size()
            }
        }
    }

    pub fn secret_key_size(&self) -> usize {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::SECRET_KEY_BYTES,
            KemAlgorithm::PostQuantum(kem) => kem.secret_key_size(),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
                x25519::SECRET_KEY_BYTES + PqKem::Kyber768.secret_key_size()
            }
        }
    }

    pub fn ciphertext_size(&self) -> usize {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::PUBLIC_KEY_BYTES,
            KemAlgorithm::PostQuantum(kem) => kem.ciphertext_size(),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
                x25519::PUBLIC_KEY_BYTES + PqKem::Kyber768.ciphertext_size()
            }
        }
    }

    pub fn shared_secret_size(&self) -> usize {
        match self {
            KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::SHARED_SECRET_BYTES,
            KemAlgorithm::PostQuantum(kem) => kem.shared_secret_size(),
            KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
                x25519::SHARED_SECRET_BYTES + PqKem::Kyber768.shared_secret_size()
            }
        }
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let kyber768 = KemAlgorithm::PostQuantum(PqKem::Kyber768);
        assert_eq!(kyber768.public_key_size(), 1184);
        assert_eq!(kyber768.ciphertext_size(), 1088);
        assert_eq!(kyber768.shared_secret_size(), 32);

        let hybrid = KemAlgorithm::Hybrid(HybridKem::X25519Kyber768);
        assert_eq!(hybrid.public_key_size(), 32 + 1184);
        assert_eq!(hybrid.ciphertext_size(), 32 + 1088);
        assert_eq!(hybrid.shared_secret_size(), 64);

        let x25519 = KemAlgorithm::Classical(ClassicalKem::X25519);
        assert_eq!(x25519.public_key_size(), 32);
        assert!(!x25519.is_post_quantum());
    }

    #[test]
    fn test_group_ids_round_trip() {
        for kem in KemAlgorithm::ALL {
            assert_eq!(KemAlgorithm::from_group_id(kem.group_id()), Some(kem));
        }
        assert_eq!(KemAlgorithm::from_group_id(0xFFFF), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(KemAlgorithm::default().name(), "X25519Kyber768");
        assert_eq!(KemAlgorithm::PostQuantum(PqKem::Kyber1024).to_string(), "Kyber1024");
    }
}
