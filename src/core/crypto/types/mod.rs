/*!
Core types for key exchange.
*/

pub mod algorithms;

pub use algorithms::{ClassicalKem, HybridKem, KemAlgorithm, PqKem};
