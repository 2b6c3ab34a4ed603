/*!
Foreign Function Interface (FFI) module for the handshake core.

This module exposes C-compatible entry points over the certificate and
key exchange components, shaped for use from C fuzzing harnesses.
*/

mod c_api;

pub use c_api::*;
