/*!
Handshake state machine.

One [`HandshakeMachine`] drives one connection. The record layer hands it
decrypted handshake messages in arrival order; the machine dispatches
each one to the chain assembler or the key exchange, advances state on
success, and returns any messages to send back.

Message flow (each side presents a certificate chain):

```text
Client                                   Server
start(server groups)                     start(client groups)
                                         <- KeyExchange(group, public key)
<- Certificate                           <- Certificate
KeyExchange(group, public key) ->
  encapsulate, derive secrets
  -> KeyExchange(group, ciphertext)
  -> Finished(client)
                                         KeyExchange(group, ciphertext) ->
                                           decapsulate, derive secrets
                                           -> Finished(server)
Finished(server) -> Complete             Finished(client) -> Complete
```

Any error moves the machine to `Failed` and releases the peer chain,
key exchange state and derived secrets before the error is returned.
*/

use std::fmt;
use std::sync::Arc;

use crate::core::blob::Blob;
use crate::core::crypto::acceleration::KemEngine;
use crate::core::crypto::key_exchange::{KemParams, SharedSecret};
use crate::core::crypto::types::algorithms::KemAlgorithm;
use crate::core::error::{Error, Result};
use crate::core::handshake::config::HandshakeConfig;
use crate::core::handshake::message::{HandshakeMessage, HandshakeType};
use crate::core::handshake::secrets::SessionSecrets;
use crate::core::handshake::state::{HandshakeState, Role, StateManager};
use crate::core::x509::chain::CertificateChain;
use crate::core::x509::provider::{CertificateProvider, DerCertificateProvider};
use crate::invalid_state_err;

/// Per-connection handshake driver
pub struct HandshakeMachine {
    config: HandshakeConfig,
    state: StateManager,
    provider: Arc<dyn CertificateProvider>,
    engine: KemEngine,
    /// Client side: groups acceptable to both peers, filled by `start`
    candidates: Vec<KemAlgorithm>,
    negotiated: Option<KemAlgorithm>,
    kem_params: Option<KemParams>,
    peer_chain: Option<CertificateChain>,
    secrets: Option<SessionSecrets>,
}

impl HandshakeMachine {
    /// Create a machine using the built-in DER certificate provider
    pub fn new(config: HandshakeConfig) -> Result<Self> {
        Self::with_provider(config, Arc::new(DerCertificateProvider))
    }

    /// Create a machine with a specific certificate provider
    pub fn with_provider(config: HandshakeConfig, provider: Arc<dyn CertificateProvider>) -> Result<Self> {
        config.validate()?;
        let engine = KemEngine::new(config.acceleration);
        Ok(Self {
            state: StateManager::new(config.role),
            config,
            provider,
            engine,
            candidates: Vec::new(),
            negotiated: None,
            kem_params: None,
            peer_chain: None,
            secrets: None,
        })
    }

    pub fn role(&self) -> Role {
        self.state.role()
    }

    pub fn state(&self) -> HandshakeState {
        self.state.state()
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// The agreed key exchange algorithm, once known
    pub fn negotiated_kem(&self) -> Option<KemAlgorithm> {
        self.negotiated
    }

    /// The peer's certificate chain, once accepted
    pub fn peer_chain(&self) -> Option<&CertificateChain> {
        self.peer_chain.as_ref()
    }

    /// Derived secrets, from KeysDerived on
    pub fn secrets(&self) -> Option<&SessionSecrets> {
        self.secrets.as_ref()
    }

    /// Hand the session secrets to the record layer once the handshake is complete
    pub fn take_secrets(&mut self) -> Result<SessionSecrets> {
        if !self.state.is_state(HandshakeState::Complete) {
            return invalid_state_err!(HandshakeState::Complete, self.state.state());
        }
        self.secrets.take().ok_or(Error::Reference("session secrets already taken"))
    }

    /// Negotiate the key exchange against the groups the peer supports.
    ///
    /// A server picks its most preferred group the peer also supports,
    /// generates the key pair and returns the KeyExchange message to send.
    /// A client records which groups it will accept from the server.
    pub fn start(&mut self, peer_supported: &[KemAlgorithm]) -> Result<Vec<HandshakeMessage>> {
        if self.state.is_state(HandshakeState::Failed) {
            return Err(Error::HandshakeFailed);
        }
        if !self.state.can_start() {
            return invalid_state_err!(HandshakeState::Start, self.state.state());
        }

        let result = self.negotiate(peer_supported);
        self.guard(result)
    }

    /// Process one framed handshake message from the peer
    pub fn process_message(&mut self, blob: &Blob) -> Result<Vec<HandshakeMessage>> {
        match self.state.state() {
            HandshakeState::Failed => return Err(Error::HandshakeFailed),
            HandshakeState::Start => return invalid_state_err!("a started handshake", HandshakeState::Start),
            HandshakeState::Complete => {
                // A finished handshake keeps its secrets; the stray message is only reported
                return Err(Error::UnexpectedMessage {
                    message: HandshakeMessage::from_blob(blob)
                        .map_or_else(|_| "malformed".to_string(), |m| m.msg_type.to_string()),
                    state: HandshakeState::Complete.to_string(),
                });
            }
            _ => {}
        }

        let result = HandshakeMessage::from_blob(blob).and_then(|message| self.dispatch(message));
        self.guard(result)
    }

    /// Abort the handshake, releasing everything it owns
    pub fn abort(&mut self) {
        if !self.state.state().is_terminal() {
            log::debug!("{} handshake aborted in state {}", self.role(), self.state.state());
        }
        self.state.transition_to_failed();
        self.release();
    }

    fn negotiate(&mut self, peer_supported: &[KemAlgorithm]) -> Result<Vec<HandshakeMessage>> {
        let mutual: Vec<KemAlgorithm> = self
            .config
            .kem_preferences
            .iter()
            .copied()
            .filter(|kem| peer_supported.contains(kem))
            .collect();
        if mutual.is_empty() {
            return Err(Error::Negotiation);
        }

        let outbound = match self.role() {
            Role::Server => {
                let kem = mutual[0];
                log::debug!("Server selected {}", kem);
                let mut params = KemParams::new(kem, self.engine.clone());
                params.generate_keypair()?;
                let message = HandshakeMessage::key_exchange(kem, &params.send_public_key()?);
                self.negotiated = Some(kem);
                self.kem_params = Some(params);
                vec![message]
            }
            Role::Client => {
                self.candidates = mutual;
                Vec::new()
            }
        };

        self.state.transition_to_awaiting_certificate();
        Ok(outbound)
    }

    fn dispatch(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        match message.msg_type {
            HandshakeType::Certificate if self.state.can_accept_certificate() => {
                self.handle_certificate(&message.body)
            }
            HandshakeType::KeyExchange if self.state.can_accept_key_exchange() => {
                self.handle_key_exchange(&message)
            }
            HandshakeType::Finished if self.state.can_accept_finished() => self.handle_finished(&message.body),
            other => Err(Error::UnexpectedMessage {
                message: other.to_string(),
                state: self.state.state().to_string(),
            }),
        }
    }

    fn handle_certificate(&mut self, body: &Blob) -> Result<Vec<HandshakeMessage>> {
        let chain = CertificateChain::assemble(body, self.provider.as_ref(), &self.config.chain_policy())?;
        log::debug!("{} accepted peer chain of {} certificates", self.role(), chain.len());
        self.peer_chain = Some(chain);
        self.state.transition_to_awaiting_key_exchange();
        Ok(Vec::new())
    }

    fn handle_key_exchange(&mut self, message: &HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        let (kem, value) = message.parse_key_exchange()?;
        match self.role() {
            Role::Client => self.client_key_exchange(kem, &value),
            Role::Server => self.server_key_exchange(kem, &value),
        }
    }

    /// Peer public key in, ciphertext and client Finished out
    fn client_key_exchange(&mut self, kem: KemAlgorithm, value: &Blob) -> Result<Vec<HandshakeMessage>> {
        if !self.candidates.contains(&kem) {
            log::warn!("Server selected {} which was not offered", kem);
            return Err(Error::Negotiation);
        }

        let mut params = KemParams::new(kem, self.engine.clone());
        let (public_key, consumed) = params.recv_public_key_from_wire(value)?;
        if consumed != value.size() {
            return Err(Error::Decode("trailing bytes after KEM public key".into()));
        }

        let encapsulation = params.encapsulate()?;
        let secrets = SessionSecrets::derive(&encapsulation.shared_secret, public_key.as_bytes(), &encapsulation.ciphertext)?;

        let outbound = vec![
            HandshakeMessage::key_exchange(kem, &params.send_ciphertext(&encapsulation.ciphertext)?),
            HandshakeMessage::new(HandshakeType::Finished, secrets.finished(Role::Client).to_vec()),
        ];

        self.negotiated = Some(kem);
        self.kem_params = Some(params);
        self.finish_key_exchange(secrets);
        Ok(outbound)
    }

    /// Ciphertext in, server Finished out
    fn server_key_exchange(&mut self, kem: KemAlgorithm, value: &Blob) -> Result<Vec<HandshakeMessage>> {
        let params = self
            .kem_params
            .as_ref()
            .ok_or(Error::Reference("key exchange state missing"))?;
        if kem != params.kem() {
            log::warn!("Client answered with {} but {} was selected", kem, params.kem());
            return Err(Error::Negotiation);
        }

        let (ciphertext, consumed) = params.recv_ciphertext(value)?;
        if consumed != value.size() {
            return Err(Error::Decode("trailing bytes after KEM ciphertext".into()));
        }

        let shared: SharedSecret = params.decapsulate(&ciphertext)?;
        let public_key = params
            .local_public_key()
            .ok_or(Error::Reference("local KEM key pair missing"))?;
        let secrets = SessionSecrets::derive(&shared, public_key, &ciphertext)?;

        let outbound = vec![HandshakeMessage::new(
            HandshakeType::Finished,
            secrets.finished(Role::Server).to_vec(),
        )];
        self.finish_key_exchange(secrets);
        Ok(outbound)
    }

    fn finish_key_exchange(&mut self, secrets: SessionSecrets) {
        self.secrets = Some(secrets);
        self.state.transition_to_keys_derived();
    }

    fn handle_finished(&mut self, body: &Blob) -> Result<Vec<HandshakeMessage>> {
        let peer = match self.role() {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        };
        let secrets = self
            .secrets
            .as_ref()
            .ok_or(Error::Reference("session secrets missing"))?;
        if !secrets.verify_finished(peer, body.as_slice()) {
            return Err(Error::FinishedMismatch);
        }

        // Key exchange state is no longer needed once secrets are confirmed
        self.kem_params = None;
        self.state.transition_to_complete();
        log::info!(
            "{} handshake complete using {}",
            self.role(),
            self.negotiated.map_or("unknown", |kem| kem.name())
        );
        Ok(Vec::new())
    }

    /// Route an operation result through the failure policy
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            log::warn!("{} handshake failed in state {}: {}", self.role(), self.state.state(), err);
            self.state.transition_to_failed();
            self.release();
        })
    }

    fn release(&mut self) {
        if let Some(chain) = self.peer_chain.take() {
            chain.release();
        }
        if let Some(mut params) = self.kem_params.take() {
            params.release();
        }
        self.secrets = None;
        self.candidates.clear();
    }
}

impl Drop for HandshakeMachine {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for HandshakeMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeMachine")
            .field("role", &self.role())
            .field("state", &self.state.state())
            .field("negotiated", &self.negotiated)
            .field("peer_chain_len", &self.peer_chain.as_ref().map(CertificateChain::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::types::algorithms::{ClassicalKem, PqKem};
    use crate::core::error::ErrorKind;
    use crate::core::x509::testing::leaf;

    fn framed(message: &HandshakeMessage) -> Blob {
        Blob::new(message.to_bytes().unwrap())
    }

    fn certificate_message(extra: &[u8]) -> Blob {
        let mut body = leaf("peer");
        body.extend_from_slice(extra);
        framed(&HandshakeMessage::new(HandshakeType::Certificate, body))
    }

    fn machines(config: HandshakeConfig) -> (HandshakeMachine, HandshakeMachine) {
        let client = HandshakeMachine::new(config.clone().with_role(Role::Client)).unwrap();
        let server = HandshakeMachine::new(config.with_role(Role::Server)).unwrap();
        (client, server)
    }

    fn run(config: HandshakeConfig) -> (HandshakeMachine, HandshakeMachine) {
        let (mut client, mut server) = machines(config.clone());
        let prefs = config.kem_preferences.clone();

        assert!(client.start(&prefs).unwrap().is_empty());
        let server_kex = server.start(&prefs).unwrap();
        assert_eq!(server_kex.len(), 1);

        client.process_message(&certificate_message(&[])).unwrap();
        server.process_message(&certificate_message(&[])).unwrap();

        let client_out = client.process_message(&framed(&server_kex[0])).unwrap();
        assert_eq!(client.state(), HandshakeState::KeysDerived);
        assert_eq!(client_out.len(), 2);

        let server_out = server.process_message(&framed(&client_out[0])).unwrap();
        assert_eq!(server.state(), HandshakeState::KeysDerived);

        server.process_message(&framed(&client_out[1])).unwrap();
        client.process_message(&framed(&server_out[0])).unwrap();
        (client, server)
    }

    #[test]
    fn test_full_handshake_each_preset() {
        for config in [
            HandshakeConfig::default(),
            HandshakeConfig::post_quantum(),
            HandshakeConfig::hybrid(),
            HandshakeConfig::classical(),
            HandshakeConfig::portable_only(),
        ] {
            let (mut client, mut server) = run(config);
            assert_eq!(client.state(), HandshakeState::Complete);
            assert_eq!(server.state(), HandshakeState::Complete);
            assert_eq!(client.negotiated_kem(), server.negotiated_kem());

            let c = client.take_secrets().unwrap();
            let s = server.take_secrets().unwrap();
            assert_eq!(c.client_write_key(), s.client_write_key());
            assert_eq!(c.server_write_key(), s.server_write_key());
        }
    }

    #[test]
    fn test_server_preference_wins() {
        let client_config = HandshakeConfig::classical().with_kems(vec![
            KemAlgorithm::Classical(ClassicalKem::X25519),
            KemAlgorithm::PostQuantum(PqKem::Kyber512),
        ]);
        let server_config = HandshakeConfig::post_quantum().with_role(Role::Server);
        let mut server = HandshakeMachine::new(server_config).unwrap();
        server.start(&client_config.kem_preferences).unwrap();
        assert_eq!(server.negotiated_kem(), Some(KemAlgorithm::PostQuantum(PqKem::Kyber512)));
    }

    #[test]
    fn test_no_common_kem_fails() {
        let mut server = HandshakeMachine::new(HandshakeConfig::classical().with_role(Role::Server)).unwrap();
        let err = server.start(&[KemAlgorithm::PostQuantum(PqKem::Kyber1024)]).unwrap_err();
        assert!(matches!(err, Error::Negotiation));
        assert_eq!(server.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_trailing_bytes_on_certificate() {
        let (mut client, _) = machines(HandshakeConfig::default());
        client.start(&HandshakeConfig::default().kem_preferences).unwrap();
        client.process_message(&certificate_message(&[0, 0])).unwrap();
        assert_eq!(client.state(), HandshakeState::AwaitingKeyExchange);
        assert_eq!(client.peer_chain().unwrap().trailing_bytes(), 2);

        let (mut client, _) = machines(HandshakeConfig::default());
        client.start(&HandshakeConfig::default().kem_preferences).unwrap();
        let err = client.process_message(&certificate_message(&[0; 10])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeCertificate);
        assert_eq!(client.state(), HandshakeState::Failed);
        assert!(client.peer_chain().is_none());
    }

    #[test]
    fn test_failed_is_sticky() {
        let (mut client, _) = machines(HandshakeConfig::default());
        client.start(&HandshakeConfig::default().kem_preferences).unwrap();
        assert!(client.process_message(&Blob::new(vec![0xFF])).is_err());
        assert_eq!(client.state(), HandshakeState::Failed);

        let err = client.process_message(&certificate_message(&[])).unwrap_err();
        assert!(matches!(err, Error::HandshakeFailed));
        assert!(matches!(client.start(&[]), Err(Error::HandshakeFailed)));
    }

    #[test]
    fn test_out_of_order_message() {
        let (mut client, _) = machines(HandshakeConfig::default());
        client.start(&HandshakeConfig::default().kem_preferences).unwrap();
        let finished = HandshakeMessage::new(HandshakeType::Finished, vec![0u8; 32]);
        let err = client.process_message(&framed(&finished)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedMessage { .. }));
        assert_eq!(client.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_short_public_key_fails_client() {
        let config = HandshakeConfig::post_quantum();
        let (mut client, _) = machines(config.clone());
        client.start(&config.kem_preferences).unwrap();
        client.process_message(&certificate_message(&[])).unwrap();

        let kem = KemAlgorithm::PostQuantum(PqKem::Kyber1024);
        let short = vec![0x42u8; kem.public_key_size() - 1];
        let mut prefixed = (short.len() as u16).to_be_bytes().to_vec();
        prefixed.extend_from_slice(&short);
        let message = HandshakeMessage::key_exchange(kem, &prefixed);

        let err = client.process_message(&framed(&message)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyLength);
        assert_eq!(client.state(), HandshakeState::Failed);
        assert!(client.secrets().is_none());
    }

    #[test]
    fn test_bad_finished() {
        let config = HandshakeConfig::classical();
        let (mut client, mut server) = machines(config.clone());
        client.start(&config.kem_preferences).unwrap();
        let server_kex = server.start(&config.kem_preferences).unwrap();
        client.process_message(&certificate_message(&[])).unwrap();
        client.process_message(&framed(&server_kex[0])).unwrap();

        let forged = HandshakeMessage::new(HandshakeType::Finished, vec![0u8; 32]);
        let err = client.process_message(&framed(&forged)).unwrap_err();
        assert!(matches!(err, Error::FinishedMismatch));
        assert_eq!(client.state(), HandshakeState::Failed);
        assert!(client.secrets().is_none());
    }

    #[test]
    fn test_unoffered_group_rejected() {
        let (mut client, mut server) = machines(HandshakeConfig::classical());
        client.start(&[KemAlgorithm::Classical(ClassicalKem::X25519)]).unwrap();
        client.process_message(&certificate_message(&[])).unwrap();

        let mut pq_server =
            HandshakeMachine::new(HandshakeConfig::post_quantum().with_role(Role::Server)).unwrap();
        let kex = pq_server.start(&HandshakeConfig::post_quantum().kem_preferences).unwrap();
        let err = client.process_message(&framed(&kex[0])).unwrap_err();
        assert!(matches!(err, Error::Negotiation));
        server.abort();
        assert_eq!(server.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_take_secrets_requires_complete() {
        let (mut client, _) = machines(HandshakeConfig::default());
        assert!(matches!(client.take_secrets(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_message_before_start() {
        let (mut client, _) = machines(HandshakeConfig::default());
        let err = client.process_message(&certificate_message(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(client.state(), HandshakeState::Start);
    }
}
