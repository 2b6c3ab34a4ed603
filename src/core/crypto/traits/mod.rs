/*!
Core traits for cryptographic operations.
*/

pub mod kex;

pub use kex::{CodePath, KemBackend};
