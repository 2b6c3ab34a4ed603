/*!
C API for the handshake core.

Each entry point takes an untrusted byte buffer, runs it through one
component and reports the outcome as a status code. Rejecting malformed
input is a normal result; only internal failures are reported as errors.
*/

use std::slice;

use libc::c_int;

use crate::core::blob::Blob;
use crate::core::crypto::acceleration::KemEngine;
use crate::core::crypto::differential::differential_recv_public_key;
use crate::core::crypto::types::algorithms::KemAlgorithm;
use crate::core::error::{Error, ErrorKind, KeyExchangeError, Result};
use crate::core::x509::chain::{CertificateChain, ChainPolicy};
use crate::core::x509::provider::DerCertificateProvider;

/// Status codes for the C API
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PqcStatus {
    /// Input accepted
    Accepted = 0,
    /// Input rejected as malformed
    Rejected = 1,
    /// Caller error (null pointer, unknown group)
    InvalidArgument = -1,
    /// Code paths disagreed or an internal invariant failed
    InternalError = -2,
}

fn status_of<T>(result: Result<T>) -> PqcStatus {
    match result {
        Ok(_) => PqcStatus::Accepted,
        Err(Error::Provider(KeyExchangeError::PathMismatch)) => PqcStatus::InternalError,
        Err(err) if err.kind() == ErrorKind::Reference => PqcStatus::InvalidArgument,
        Err(_) => PqcStatus::Rejected,
    }
}

/// Borrow `len` bytes at `buf`; a null pointer is only valid for an empty buffer
///
/// # Safety
/// `buf` must be valid for reads of `len` bytes when non-null.
unsafe fn input<'a>(buf: *const u8, len: usize) -> Option<&'a [u8]> {
    if buf.is_null() {
        return if len == 0 { Some(&[]) } else { None };
    }
    // SAFETY: caller guarantees `buf` is readable for `len` bytes
    Some(unsafe { slice::from_raw_parts(buf, len) })
}

/// Assemble a certificate chain from `buf` with the default limits
///
/// @param buf Concatenated DER certificates
/// @param len Length of the buffer
/// @return 0 when accepted, 1 when rejected, negative on caller or internal error
///
/// # Safety
/// `buf` must be valid for reads of `len` bytes, or null with `len == 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pqc_fuzz_parse_chain(buf: *const u8, len: usize) -> c_int {
    // SAFETY: forwarded from the caller's contract
    let Some(bytes) = (unsafe { input(buf, len) }) else {
        return PqcStatus::InvalidArgument as c_int;
    };

    let blob = Blob::copy_from_slice(bytes);
    let result = CertificateChain::assemble(&blob, &DerCertificateProvider, &ChainPolicy::default());
    status_of(result) as c_int
}

/// Receive a length-prefixed KEM public key and encapsulate to it on every
/// available code path, failing if the paths disagree
///
/// @param buf Length-prefixed public key
/// @param len Length of the buffer
/// @param group_id Named-group id of the KEM
/// @return 0 when accepted, 1 when rejected, negative on caller or internal error
///
/// # Safety
/// `buf` must be valid for reads of `len` bytes, or null with `len == 0`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pqc_fuzz_recv_public_key(buf: *const u8, len: usize, group_id: u16) -> c_int {
    // SAFETY: forwarded from the caller's contract
    let Some(bytes) = (unsafe { input(buf, len) }) else {
        return PqcStatus::InvalidArgument as c_int;
    };
    let Some(kem) = KemAlgorithm::from_group_id(group_id) else {
        return PqcStatus::InvalidArgument as c_int;
    };

    let engine = KemEngine::default();
    match differential_recv_public_key(bytes, kem, &engine) {
        Ok(report) if report.outcome.is_accepted() => PqcStatus::Accepted as c_int,
        Ok(_) => PqcStatus::Rejected as c_int,
        Err(err) => status_of::<()>(Err(err)) as c_int,
    }
}
