/*!
Constants for the handshake core.

This module contains the wire constants, key sizes and policy defaults
used across certificate decoding, key exchange and the handshake.
*/

/// Protocol version carried in derived-secret labels
pub const VERSION: u8 = 0x01;

/// Default number of bytes tolerated after the final certificate in a chain.
///
/// Some peers append a few bytes after the last certificate of a
/// Certificate message; anything beyond this is treated as malformed.
pub const MAX_ALLOWED_CERT_TRAILING_BYTES: usize = 3;

/// Default maximum number of certificates accepted in one chain
pub const MAX_CHAIN_LENGTH: usize = 10;

/// Maximum body length a handshake message can declare (24-bit length field)
pub const MAX_HANDSHAKE_MESSAGE_LEN: usize = (1 << 24) - 1;

/// Size constants for the handshake
pub mod sizes {
    /// Handshake message header: 1 byte type + 3 byte length
    pub const HANDSHAKE_HEADER_SIZE: usize = 4;

    /// Length prefix in front of KEM public keys and ciphertexts on the wire
    pub const KEM_LENGTH_PREFIX_SIZE: usize = 2;

    /// CRYSTALS-Kyber constants
    pub mod kyber {
        /// Kyber512 public key size in bytes
        pub const KYBER512_PUBLIC_KEY_BYTES: usize = 800;
        /// Kyber512 secret key size in bytes
        pub const KYBER512_SECRET_KEY_BYTES: usize = 1632;
        /// Kyber512 ciphertext size in bytes
        pub const KYBER512_CIPHERTEXT_BYTES: usize = 768;

        /// Kyber768 public key size in bytes
        pub const KYBER768_PUBLIC_KEY_BYTES: usize = 1184;
        /// Kyber768 secret key size in bytes
        pub const KYBER768_SECRET_KEY_BYTES: usize = 2400;
        /// Kyber768 ciphertext size in bytes
        pub const KYBER768_CIPHERTEXT_BYTES: usize = 1088;

        /// Kyber1024 public key size in bytes
        pub const KYBER1024_PUBLIC_KEY_BYTES: usize = 1568;
        /// Kyber1024 secret key size in bytes
        pub const KYBER1024_SECRET_KEY_BYTES: usize = 3168;
        /// Kyber1024 ciphertext size in bytes
        pub const KYBER1024_CIPHERTEXT_BYTES: usize = 1568;

        /// Shared secret size for every Kyber parameter set
        pub const SHARED_SECRET_BYTES: usize = 32;
    }

    /// X25519 constants
    pub mod x25519 {
        /// Public key (u-coordinate) size
        pub const PUBLIC_KEY_BYTES: usize = 32;
        /// Scalar size
        pub const SECRET_KEY_BYTES: usize = 32;
        /// Shared secret size
        pub const SHARED_SECRET_BYTES: usize = 32;
    }

    /// Derived session secret sizes
    pub mod secrets {
        /// Traffic key size
        pub const WRITE_KEY_SIZE: usize = 32;
        /// Finished verify data size
        pub const FINISHED_SIZE: usize = 32;
    }
}

/// Label prefix for HKDF expansion of session secrets
pub const HKDF_LABEL_PREFIX: &[u8] = b"pqc-handshake v1 ";

/// Info string for the client write key
pub const HKDF_INFO_CLIENT_WRITE: &[u8] = b"client write key";

/// Info string for the server write key
pub const HKDF_INFO_SERVER_WRITE: &[u8] = b"server write key";

/// Info string for the client finished value
pub const HKDF_INFO_CLIENT_FINISHED: &[u8] = b"client finished";

/// Info string for the server finished value
pub const HKDF_INFO_SERVER_FINISHED: &[u8] = b"server finished";
