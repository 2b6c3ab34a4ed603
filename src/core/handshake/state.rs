/*!
Handshake state management.

This module defines handshake states and the state machine for handshake
progression. States only move forward; `Failed` is reachable from any
non-terminal state and is sticky.
*/

use std::fmt;

/// Handshake state for tracking connection progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandshakeState {
    /// Nothing negotiated yet
    Start,
    /// Key exchange negotiated, waiting for the peer's certificate chain
    AwaitingCertificate,
    /// Certificate chain accepted, waiting for the peer's key exchange
    AwaitingKeyExchange,
    /// Session secrets derived, waiting for the peer's Finished
    KeysDerived,
    /// Peer Finished verified
    Complete,
    /// Handshake aborted; no further messages are processed
    Failed,
}

impl HandshakeState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Complete | HandshakeState::Failed)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Start => write!(f, "Start"),
            HandshakeState::AwaitingCertificate => write!(f, "AwaitingCertificate"),
            HandshakeState::AwaitingKeyExchange => write!(f, "AwaitingKeyExchange"),
            HandshakeState::KeysDerived => write!(f, "KeysDerived"),
            HandshakeState::Complete => write!(f, "Complete"),
            HandshakeState::Failed => write!(f, "Failed"),
        }
    }
}

/// Endpoint role in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Client role (encapsulates to the server's key)
    Client,
    /// Server role (owns the KEM key pair)
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}

/// Handshake state manager
///
/// Handles state transitions and decides which messages are acceptable
/// in the current state.
#[derive(Debug, Clone, Copy)]
pub struct StateManager {
    /// Current state of the handshake
    state: HandshakeState,
    /// Role of this endpoint
    role: Role,
}

impl StateManager {
    /// Create a new state manager
    pub fn new(role: Role) -> Self {
        Self {
            state: HandshakeState::Start,
            role,
        }
    }

    /// Get the current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Get the role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Check if the handshake is in the given state
    pub fn is_state(&self, state: HandshakeState) -> bool {
        self.state == state
    }

    pub fn can_start(&self) -> bool {
        self.state == HandshakeState::Start
    }

    pub fn can_accept_certificate(&self) -> bool {
        self.state == HandshakeState::AwaitingCertificate
    }

    pub fn can_accept_key_exchange(&self) -> bool {
        self.state == HandshakeState::AwaitingKeyExchange
    }

    pub fn can_accept_finished(&self) -> bool {
        self.state == HandshakeState::KeysDerived
    }

    /// Transition to the awaiting certificate state
    pub fn transition_to_awaiting_certificate(&mut self) {
        if self.can_start() {
            self.transition(HandshakeState::AwaitingCertificate);
        }
    }

    /// Transition to the awaiting key exchange state
    pub fn transition_to_awaiting_key_exchange(&mut self) {
        if self.can_accept_certificate() {
            self.transition(HandshakeState::AwaitingKeyExchange);
        }
    }

    /// Transition to the keys derived state
    pub fn transition_to_keys_derived(&mut self) {
        if self.can_accept_key_exchange() {
            self.transition(HandshakeState::KeysDerived);
        }
    }

    /// Transition to the complete state
    pub fn transition_to_complete(&mut self) {
        if self.can_accept_finished() {
            self.transition(HandshakeState::Complete);
        }
    }

    /// Transition to the failed state
    pub fn transition_to_failed(&mut self) {
        if !self.state.is_terminal() {
            self.transition(HandshakeState::Failed);
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        log::debug!("{} handshake: {} -> {}", self.role, self.state, next);
        self.state = next;
    }
}
