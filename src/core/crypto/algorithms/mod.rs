/*!
Implementations of cryptographic algorithms.
*/

// Key exchange algorithms
pub mod kex;
