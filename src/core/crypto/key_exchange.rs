/*!
Key exchange state for one handshake.

[`KemParams`] holds the negotiated algorithm, the engine that selects
the code path, the local key pair (server side) and the validated peer
public key (client side). On the wire, public keys and ciphertexts carry
a 16-bit big-endian length prefix that must equal the algorithm's fixed
size.

All key material is zeroized when the params are released or dropped.
*/

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::core::blob::Blob;
use crate::core::constants::sizes::{x25519 as x25519_sizes, KEM_LENGTH_PREFIX_SIZE};
use crate::core::crypto::acceleration::KemEngine;
use crate::core::crypto::algorithms::kex::x25519;
use crate::core::crypto::traits::kex::KemBackend;
use crate::core::crypto::types::algorithms::{ClassicalKem, HybridKem, KemAlgorithm, PqKem};
use crate::core::error::{Error, Result};

/// A shared secret; zeroized on drop, compared in constant time
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub(crate) fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && bool::from(self.0[..].ct_eq(&other.0[..]))
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}

/// Result of encapsulating to a peer public key
#[derive(Debug, Clone)]
pub struct Encapsulation {
    /// Ciphertext to send to the key owner
    pub ciphertext: Vec<u8>,
    /// Secret shared with the key owner
    pub shared_secret: SharedSecret,
}

/// A public key whose length matches its algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    kem: KemAlgorithm,
    bytes: Blob,
}

impl KemPublicKey {
    /// Validate `blob` as a public key for `kem`
    pub fn new(kem: KemAlgorithm, blob: Blob) -> Result<Self> {
        check_public_key_len(kem, blob.size())?;
        Ok(Self { kem, bytes: blob })
    }

    pub fn kem(&self) -> KemAlgorithm {
        self.kem
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

fn check_public_key_len(kem: KemAlgorithm, actual: usize) -> Result<()> {
    if actual != kem.public_key_size() {
        return Err(Error::KeyLength {
            algorithm: kem.name(),
            expected: kem.public_key_size(),
            actual,
        });
    }
    Ok(())
}

fn check_ciphertext_len(kem: KemAlgorithm, actual: usize) -> Result<()> {
    if actual != kem.ciphertext_size() {
        return Err(Error::CiphertextLength {
            algorithm: kem.name(),
            expected: kem.ciphertext_size(),
            actual,
        });
    }
    Ok(())
}

/// Generate a key pair for `kem` on `backend`
pub(crate) fn generate_with(kem: KemAlgorithm, backend: &dyn KemBackend) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    match kem {
        KemAlgorithm::Classical(ClassicalKem::X25519) => Ok(x25519::keypair()),
        KemAlgorithm::PostQuantum(pq) => backend.keypair(pq),
        KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
            let (classical_pk, classical_sk) = x25519::keypair();
            let (pq_pk, pq_sk) = backend.keypair(PqKem::Kyber768)?;
            let public_key = [classical_pk, pq_pk].concat();
            let mut secret_key = Zeroizing::new(Vec::with_capacity(classical_sk.len() + pq_sk.len()));
            secret_key.extend_from_slice(&classical_sk);
            secret_key.extend_from_slice(&pq_sk);
            Ok((public_key, secret_key))
        }
    }
}

/// Encapsulate to `public_key` on `backend`
pub(crate) fn encapsulate_with(
    kem: KemAlgorithm,
    backend: &dyn KemBackend,
    public_key: &[u8],
) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    check_public_key_len(kem, public_key.len())?;
    match kem {
        KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::encapsulate(public_key),
        KemAlgorithm::PostQuantum(pq) => backend.encapsulate(pq, public_key),
        KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
            let (classical_pk, pq_pk) = public_key.split_at(x25519_sizes::PUBLIC_KEY_BYTES);
            let (classical_ct, classical_ss) = x25519::encapsulate(classical_pk)?;
            let (pq_ct, pq_ss) = backend.encapsulate(PqKem::Kyber768, pq_pk)?;
            Ok((concat_ciphertext(classical_ct, pq_ct), concat_secret(&classical_ss, &pq_ss)))
        }
    }
}

/// Decapsulate `ciphertext` with `secret_key` on `backend`
pub(crate) fn decapsulate_with(
    kem: KemAlgorithm,
    backend: &dyn KemBackend,
    ciphertext: &[u8],
    secret_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    check_ciphertext_len(kem, ciphertext.len())?;
    if secret_key.len() != kem.secret_key_size() {
        return Err(Error::Reference("secret key does not match negotiated algorithm"));
    }
    match kem {
        KemAlgorithm::Classical(ClassicalKem::X25519) => x25519::decapsulate(ciphertext, secret_key),
        KemAlgorithm::PostQuantum(pq) => backend.decapsulate(pq, ciphertext, secret_key),
        KemAlgorithm::Hybrid(HybridKem::X25519Kyber768) => {
            let (classical_ct, pq_ct) = ciphertext.split_at(x25519_sizes::PUBLIC_KEY_BYTES);
            let (classical_sk, pq_sk) = secret_key.split_at(x25519_sizes::SECRET_KEY_BYTES);
            let classical_ss = x25519::decapsulate(classical_ct, classical_sk)?;
            let pq_ss = backend.decapsulate(PqKem::Kyber768, pq_ct, pq_sk)?;
            Ok(concat_secret(&classical_ss, &pq_ss))
        }
    }
}

fn concat_ciphertext(classical: Vec<u8>, pq: Vec<u8>) -> Vec<u8> {
    [classical, pq].concat()
}

fn concat_secret(classical: &[u8], pq: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut secret = Zeroizing::new(Vec::with_capacity(classical.len() + pq.len()));
    secret.extend_from_slice(classical);
    secret.extend_from_slice(pq);
    secret
}

/// Read a 16-bit length prefix and the value it announces.
///
/// Returns the declared length, the value (possibly short) and the bytes consumed.
fn read_prefixed(data: &[u8]) -> Result<(usize, &[u8], usize)> {
    if data.len() < KEM_LENGTH_PREFIX_SIZE {
        return Err(Error::Decode("missing KEM length prefix".into()));
    }
    let declared = BigEndian::read_u16(&data[..KEM_LENGTH_PREFIX_SIZE]) as usize;
    let body = &data[KEM_LENGTH_PREFIX_SIZE..];
    let value = &body[..declared.min(body.len())];
    Ok((declared, value, KEM_LENGTH_PREFIX_SIZE + value.len()))
}

/// Encode `value` behind a 16-bit big-endian length prefix
pub fn write_prefixed(value: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(value.len()).map_err(|_| Error::Reference("KEM value exceeds 16-bit length"))?;
    let mut out = vec![0u8; KEM_LENGTH_PREFIX_SIZE];
    BigEndian::write_u16(&mut out, len);
    out.extend_from_slice(value);
    Ok(out)
}

/// Negotiated key exchange state for one handshake
pub struct KemParams {
    kem: KemAlgorithm,
    engine: KemEngine,
    local_public_key: Option<Vec<u8>>,
    local_secret_key: Option<Zeroizing<Vec<u8>>>,
    peer_public_key: Option<KemPublicKey>,
}

impl KemParams {
    /// Params for `kem`, running on `engine`
    pub fn new(kem: KemAlgorithm, engine: KemEngine) -> Self {
        Self {
            kem,
            engine,
            local_public_key: None,
            local_secret_key: None,
            peer_public_key: None,
        }
    }

    /// The negotiated algorithm
    pub fn kem(&self) -> KemAlgorithm {
        self.kem
    }

    pub fn engine(&self) -> &KemEngine {
        &self.engine
    }

    /// Accept a raw public key; its size must equal the algorithm's public key size exactly
    pub fn recv_public_key(&mut self, blob: &Blob) -> Result<KemPublicKey> {
        let key = KemPublicKey::new(self.kem, blob.clone()).inspect_err(|_| {
            log::debug!("Rejected {} public key of {} bytes", self.kem, blob.size());
        })?;
        self.peer_public_key = Some(key.clone());
        Ok(key)
    }

    /// Accept a length-prefixed public key from the front of `blob`.
    ///
    /// Returns the key and the number of bytes consumed.
    pub fn recv_public_key_from_wire(&mut self, blob: &Blob) -> Result<(KemPublicKey, usize)> {
        let (declared, value, consumed) = read_prefixed(blob.as_slice())?;
        check_public_key_len(self.kem, declared)?;
        let key = self.recv_public_key(&blob.slice(KEM_LENGTH_PREFIX_SIZE..KEM_LENGTH_PREFIX_SIZE + value.len())?)?;
        Ok((key, consumed))
    }

    /// Length-prefixed local public key
    pub fn send_public_key(&self) -> Result<Vec<u8>> {
        let public_key = self
            .local_public_key
            .as_deref()
            .ok_or(Error::Reference("no local KEM key pair"))?;
        write_prefixed(public_key)
    }

    /// Generate the local key pair (key owner side)
    pub fn generate_keypair(&mut self) -> Result<KemPublicKey> {
        let (public_key, secret_key) = generate_with(self.kem, self.engine.backend())?;
        log::debug!("Generated {} key pair on {} path", self.kem, self.engine.path());
        let key = KemPublicKey::new(self.kem, Blob::new(public_key.clone()))?;
        self.local_public_key = Some(public_key);
        self.local_secret_key = Some(secret_key);
        Ok(key)
    }

    /// Encapsulate to the received peer public key
    pub fn encapsulate(&self) -> Result<Encapsulation> {
        let peer = self
            .peer_public_key
            .as_ref()
            .ok_or(Error::Reference("no peer KEM public key"))?;
        self.encapsulate_to(peer)
    }

    /// Encapsulate to a specific validated public key
    pub fn encapsulate_to(&self, public_key: &KemPublicKey) -> Result<Encapsulation> {
        if public_key.kem() != self.kem {
            return Err(Error::UnsupportedAlgorithm(public_key.kem().name().to_string()));
        }
        let (ciphertext, shared_secret) = encapsulate_with(self.kem, self.engine.backend(), public_key.as_bytes())?;
        Ok(Encapsulation {
            ciphertext,
            shared_secret: SharedSecret::new(shared_secret),
        })
    }

    /// Length-prefixed ciphertext for the wire
    pub fn send_ciphertext(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        check_ciphertext_len(self.kem, ciphertext.len())?;
        write_prefixed(ciphertext)
    }

    /// Read a length-prefixed ciphertext from the front of `blob`.
    ///
    /// Returns the ciphertext and the number of bytes consumed.
    pub fn recv_ciphertext(&self, blob: &Blob) -> Result<(Vec<u8>, usize)> {
        let (declared, value, consumed) = read_prefixed(blob.as_slice())?;
        check_ciphertext_len(self.kem, declared)?;
        check_ciphertext_len(self.kem, value.len())?;
        Ok((value.to_vec(), consumed))
    }

    /// Recover the shared secret with the local secret key
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<SharedSecret> {
        let secret_key = self
            .local_secret_key
            .as_ref()
            .ok_or(Error::Reference("no local KEM key pair"))?;
        let shared = decapsulate_with(self.kem, self.engine.backend(), ciphertext, secret_key)?;
        Ok(SharedSecret::new(shared))
    }

    /// Local public key, if generated
    pub fn local_public_key(&self) -> Option<&[u8]> {
        self.local_public_key.as_deref()
    }

    /// Validated peer public key, if received
    pub fn peer_public_key(&self) -> Option<&KemPublicKey> {
        self.peer_public_key.as_ref()
    }

    /// Drop all key material
    pub fn release(&mut self) {
        self.local_public_key = None;
        self.local_secret_key = None;
        self.peer_public_key = None;
    }
}

impl Drop for KemParams {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for KemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KemParams")
            .field("kem", &self.kem)
            .field("engine", &self.engine)
            .field("has_keypair", &self.local_secret_key.is_some())
            .field("has_peer_key", &self.peer_public_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn params(kem: KemAlgorithm) -> KemParams {
        KemParams::new(kem, KemEngine::portable())
    }

    #[test]
    fn test_exchange_every_algorithm() {
        for kem in KemAlgorithm::ALL {
            let mut server = params(kem);
            let public_key = server.generate_keypair().unwrap();
            assert_eq!(public_key.as_bytes().len(), kem.public_key_size());

            let mut client = params(kem);
            client.recv_public_key(&Blob::copy_from_slice(public_key.as_bytes())).unwrap();
            let enc = client.encapsulate().unwrap();
            assert_eq!(enc.ciphertext.len(), kem.ciphertext_size());
            assert_eq!(enc.shared_secret.len(), kem.shared_secret_size());

            let shared = server.decapsulate(&enc.ciphertext).unwrap();
            assert_eq!(shared, enc.shared_secret);
        }
    }

    #[test]
    fn test_recv_public_key_exact_length() {
        let kem = KemAlgorithm::PostQuantum(PqKem::Kyber768);
        let mut client = params(kem);

        let short = Blob::new(vec![0u8; kem.public_key_size() - 1]);
        let err = client.recv_public_key(&short).unwrap_err();
        assert!(matches!(err, Error::KeyLength { expected: 1184, actual: 1183, .. }));
        assert!(client.peer_public_key().is_none());

        let long = Blob::new(vec![0u8; kem.public_key_size() + 1]);
        assert_eq!(client.recv_public_key(&long).unwrap_err().kind(), ErrorKind::KeyLength);

        assert_eq!(client.recv_public_key(&Blob::empty()).unwrap_err().kind(), ErrorKind::KeyLength);
    }

    #[test]
    fn test_wire_format() {
        let kem = KemAlgorithm::Classical(ClassicalKem::X25519);
        let mut server = params(kem);
        server.generate_keypair().unwrap();
        let wire = server.send_public_key().unwrap();
        assert_eq!(&wire[..2], &[0x00, 0x20]);
        assert_eq!(wire.len(), 34);

        let mut client = params(kem);
        let mut with_extra = wire.clone();
        with_extra.push(0xEE);
        let (key, consumed) = client.recv_public_key_from_wire(&Blob::new(with_extra)).unwrap();
        assert_eq!(consumed, 34);
        assert_eq!(key.as_bytes(), &wire[2..]);

        let enc = client.encapsulate().unwrap();
        let ct_wire = client.send_ciphertext(&enc.ciphertext).unwrap();
        let (ct, consumed) = server.recv_ciphertext(&Blob::new(ct_wire)).unwrap();
        assert_eq!(consumed, 34);
        assert_eq!(server.decapsulate(&ct).unwrap(), enc.shared_secret);
    }

    #[test]
    fn test_wire_length_mismatch() {
        let kem = KemAlgorithm::Classical(ClassicalKem::X25519);
        let mut client = params(kem);

        // declared 31
        let mut wire = vec![0x00, 0x1F];
        wire.extend_from_slice(&[9u8; 31]);
        assert!(matches!(
            client.recv_public_key_from_wire(&Blob::new(wire)),
            Err(Error::KeyLength { expected: 32, actual: 31, .. })
        ));

        // declared 32 but only 10 present
        let mut wire = vec![0x00, 0x20];
        wire.extend_from_slice(&[9u8; 10]);
        assert!(matches!(
            client.recv_public_key_from_wire(&Blob::new(wire)),
            Err(Error::KeyLength { expected: 32, actual: 10, .. })
        ));

        assert!(matches!(client.recv_public_key_from_wire(&Blob::new(vec![0x00])), Err(Error::Decode(_))));
    }

    #[test]
    fn test_missing_state_is_reference_error() {
        let kem = KemAlgorithm::default();
        let p = params(kem);
        assert_eq!(p.encapsulate().unwrap_err().kind(), ErrorKind::Reference);
        assert_eq!(p.send_public_key().unwrap_err().kind(), ErrorKind::Reference);
        assert_eq!(p.decapsulate(&vec![0u8; kem.ciphertext_size()]).unwrap_err().kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_release_clears_keys() {
        let mut p = params(KemAlgorithm::PostQuantum(PqKem::Kyber512));
        p.generate_keypair().unwrap();
        assert!(p.local_public_key().is_some());
        p.release();
        assert!(p.local_public_key().is_none());
        assert!(p.send_public_key().is_err());
    }

    #[test]
    fn test_shared_secret_debug_redacted() {
        let secret = SharedSecret::new(Zeroizing::new(vec![0xAB; 32]));
        assert_eq!(format!("{:?}", secret), "SharedSecret([REDACTED; 32])");
    }
}
