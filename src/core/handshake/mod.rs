/*!
Handshake layer.

Message framing, endpoint configuration, state tracking, secret
derivation and the per-connection state machine that ties the
certificate and key exchange components together.
*/

pub mod config;
pub mod machine;
pub mod message;
pub mod secrets;
pub mod state;

pub use config::HandshakeConfig;
pub use machine::HandshakeMachine;
pub use message::{HandshakeMessage, HandshakeType};
pub use secrets::SessionSecrets;
pub use state::{HandshakeState, Role, StateManager};
