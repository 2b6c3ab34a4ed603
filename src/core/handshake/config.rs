/*!
Handshake configuration.

Selects the endpoint role, the key exchange algorithms this endpoint is
willing to use (most preferred first), certificate chain limits, and
whether the accelerated KEM path may be used.
*/

use crate::core::constants::{MAX_ALLOWED_CERT_TRAILING_BYTES, MAX_CHAIN_LENGTH};
use crate::core::crypto::acceleration::AccelerationConfig;
use crate::core::crypto::types::algorithms::{ClassicalKem, HybridKem, KemAlgorithm, PqKem};
use crate::core::error::{Error, Result};
use crate::core::handshake::state::Role;
use crate::core::x509::chain::ChainPolicy;

/// Configuration for one handshake endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct HandshakeConfig {
    /// Endpoint role
    pub role: Role,
    /// Acceptable key exchange algorithms, most preferred first
    pub kem_preferences: Vec<KemAlgorithm>,
    /// Bytes tolerated after the final certificate of a chain
    pub max_cert_trailing_bytes: usize,
    /// Maximum certificates in a peer chain
    pub max_chain_length: usize,
    /// Accelerated KEM path settings
    pub acceleration: AccelerationConfig,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            role: Role::Client,
            kem_preferences: vec![
                KemAlgorithm::Hybrid(HybridKem::X25519Kyber768),
                KemAlgorithm::PostQuantum(PqKem::Kyber768),
                KemAlgorithm::Classical(ClassicalKem::X25519),
            ],
            max_cert_trailing_bytes: MAX_ALLOWED_CERT_TRAILING_BYTES,
            max_chain_length: MAX_CHAIN_LENGTH,
            acceleration: AccelerationConfig::default(),
        }
    }
}

impl HandshakeConfig {
    /// Create a new configuration with default settings
    pub fn new(role: Role) -> Self {
        Self::default().with_role(role)
    }

    /// Only post-quantum algorithms, strongest first
    pub fn post_quantum() -> Self {
        Self {
            kem_preferences: vec![
                KemAlgorithm::PostQuantum(PqKem::Kyber1024),
                KemAlgorithm::PostQuantum(PqKem::Kyber768),
                KemAlgorithm::PostQuantum(PqKem::Kyber512),
            ],
            ..Self::default()
        }
    }

    /// Only the hybrid algorithm
    pub fn hybrid() -> Self {
        Self {
            kem_preferences: vec![KemAlgorithm::Hybrid(HybridKem::X25519Kyber768)],
            ..Self::default()
        }
    }

    /// Only classical key agreement
    pub fn classical() -> Self {
        Self {
            kem_preferences: vec![KemAlgorithm::Classical(ClassicalKem::X25519)],
            ..Self::default()
        }
    }

    /// Default algorithms, reference implementation only
    pub fn portable_only() -> Self {
        Self {
            acceleration: AccelerationConfig::portable_only(),
            ..Self::default()
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Replace the preference list
    pub fn with_kems(mut self, kems: Vec<KemAlgorithm>) -> Self {
        self.kem_preferences = kems;
        self
    }

    /// Chain limits derived from this configuration
    pub fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            max_trailing_bytes: self.max_cert_trailing_bytes,
            max_chain_length: self.max_chain_length,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.kem_preferences.is_empty() {
            return Err(Error::Config("no key exchange algorithms configured".into()));
        }

        for (i, kem) in self.kem_preferences.iter().enumerate() {
            if self.kem_preferences[..i].contains(kem) {
                return Err(Error::Config(format!("{} listed more than once", kem)));
            }
        }

        if self.max_chain_length == 0 {
            return Err(Error::Config("max_chain_length must be at least 1".into()));
        }

        Ok(())
    }

    /// Name of the most preferred key exchange algorithm
    pub fn preferred_kem_name(&self) -> &'static str {
        self.kem_preferences.first().map_or("none", KemAlgorithm::name)
    }
}
