/*!
Code path selection for the KEM primitive.

The choice between the portable and accelerated backends is explicit
state owned by a [`KemEngine`]; nothing is toggled globally. Disabling
acceleration always forces the portable path, and enabling it only takes
effect when the CPU supports it.
*/

use std::fmt;
use std::sync::Arc;

use crate::core::crypto::algorithms::kex::{AcceleratedKyber, PortableKyber};
use crate::core::crypto::traits::kex::{CodePath, KemBackend};

/// Acceleration settings passed into the KEM engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelerationConfig {
    /// Use the accelerated path when the CPU supports it
    pub enabled: bool,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AccelerationConfig {
    /// Always use the reference implementation
    pub fn portable_only() -> Self {
        Self { enabled: false }
    }
}

/// Selects which backend runs post-quantum KEM operations
#[derive(Clone)]
pub struct KemEngine {
    portable: Arc<dyn KemBackend>,
    accelerated: Arc<dyn KemBackend>,
    use_accelerated: bool,
}

impl KemEngine {
    /// Engine with the built-in backends, enabling acceleration per `config`
    pub fn new(config: AccelerationConfig) -> Self {
        let mut engine = Self::portable();
        if config.enabled {
            engine.try_enable_accelerated();
        }
        engine
    }

    /// Engine pinned to the portable path
    pub fn portable() -> Self {
        Self::with_backends(Arc::new(PortableKyber), Arc::new(AcceleratedKyber))
    }

    /// Engine over caller-supplied backends, starting on the portable path
    pub fn with_backends(portable: Arc<dyn KemBackend>, accelerated: Arc<dyn KemBackend>) -> Self {
        Self {
            portable,
            accelerated,
            use_accelerated: false,
        }
    }

    /// Whether the accelerated path can run on this machine
    pub fn accelerated_available(&self) -> bool {
        self.accelerated.is_available()
    }

    /// Switch to the accelerated path if available; returns whether it is now in use
    pub fn try_enable_accelerated(&mut self) -> bool {
        if !self.use_accelerated && self.accelerated_available() {
            log::info!("Using accelerated KEM code path");
            self.use_accelerated = true;
        }
        self.use_accelerated
    }

    /// Force the portable path
    pub fn disable_accelerated(&mut self) {
        if self.use_accelerated {
            log::debug!("Accelerated KEM code path disabled");
        }
        self.use_accelerated = false;
    }

    /// Whether operations currently run on the accelerated path
    pub fn accelerated_enabled(&self) -> bool {
        self.use_accelerated
    }

    /// The active code path
    pub fn path(&self) -> CodePath {
        if self.use_accelerated {
            CodePath::Accelerated
        } else {
            CodePath::Portable
        }
    }

    /// The active backend
    pub fn backend(&self) -> &dyn KemBackend {
        if self.use_accelerated {
            self.accelerated.as_ref()
        } else {
            self.portable.as_ref()
        }
    }

    /// A specific backend, if it can run here
    pub fn backend_for(&self, path: CodePath) -> Option<&dyn KemBackend> {
        match path {
            CodePath::Portable => Some(self.portable.as_ref()),
            CodePath::Accelerated if self.accelerated_available() => Some(self.accelerated.as_ref()),
            CodePath::Accelerated => None,
        }
    }
}

impl Default for KemEngine {
    fn default() -> Self {
        Self::new(AccelerationConfig::default())
    }
}

impl fmt::Debug for KemEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KemEngine")
            .field("path", &self.path())
            .field("accelerated_available", &self.accelerated_available())
            .finish()
    }
}
