//! Session state machine.
//!
//! A Session drives one connection through the protocol:
//!
//! ```text
//! Init → Connected → Registering → Registered ─────────┐
//!                                └→ RegistrationFailed ─┤ (returning client only)
//!                                                       ▼
//!                     KeyExchangeFailed ←─ ExchangingKeys → KeysReady
//!                                                              │
//!             ┌──────────── mismatch, attempt < 4 ─────────────┤
//!             ▼                                                ▼
//!       Transferring → AwaitingChecksum → Done | FinalFail
//! ```
//!
//! Each step is a method that sends one request, blocks for the matching
//! response and returns what the next step needs. The state label only
//! records progress and rejects out-of-order calls.

use crate::config::TransferInfo;
use crate::error::{Error, SessionError, ValidationError};
use crate::identity::{ClientId, ClientIdentity, DisplayName};
use crate::store::IdentityStore;
use crate::transfer::TransferItem;
use crate::wire::{ChecksumReport, Request, RequestCode, Response, ResponseCode};
use crate::{MAX_ATTEMPTS, NAME_SIZE};
use cipherpost_crypto::{KeyPair, PUBLIC_KEY_SIZE, TransferKey, encoding};
use cipherpost_files::SourceFile;
use cipherpost_transport::{TcpTransport, Transport, TransportConfig};
use std::path::Path;
use zeroize::Zeroizing;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not connected
    Init,
    /// Transport established
    Connected,
    /// Registration request sent
    Registering,
    /// Server accepted the registration
    Registered,
    /// Server refused the registration
    RegistrationFailed,
    /// Public key sent
    ExchangingKeys,
    /// Transfer key held
    KeysReady,
    /// Server refused the key exchange
    KeyExchangeFailed,
    /// File being sent
    Transferring,
    /// Waiting for the server's checksum
    AwaitingChecksum,
    /// Checksum matched and was acknowledged
    Done,
    /// Checksum mismatched on the last attempt
    FinalFail,
    /// Disconnect announced, transport closed
    Disconnected,
}

impl SessionState {
    /// True for states no step can leave except by disconnecting
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::FinalFail | Self::KeyExchangeFailed | Self::Disconnected
        )
    }
}

/// Retry bookkeeping for the active upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounters {
    /// Current send, 1-based
    pub attempt: u32,
    /// Plaintext checksum of the last send
    pub last_checksum: Option<u32>,
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self {
            attempt: 1,
            last_checksum: None,
        }
    }
}

impl SessionCounters {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of [`Session::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Server accepted the name
    Accepted {
        /// Identity to continue with
        identity: ClientIdentity,
        /// Whether the identity record was written by this call
        saved: bool,
    },
    /// Server refused the name
    Rejected {
        /// Identity from an existing record, if there is a valid one
        returning: Option<ClientIdentity>,
    },
}

/// Keys for one upload session
#[derive(Debug)]
pub struct KeyMaterial {
    transfer_key: TransferKey,
}

impl KeyMaterial {
    /// Wrap a transfer key
    #[must_use]
    pub fn new(transfer_key: TransferKey) -> Self {
        Self { transfer_key }
    }

    /// Symmetric key for file content
    #[must_use]
    pub fn transfer_key(&self) -> &TransferKey {
        &self.transfer_key
    }
}

/// Result of [`Session::exchange_keys`]
#[derive(Debug)]
pub enum KeyExchange {
    /// Transfer key received
    Ready(KeyMaterial),
    /// Server does not know this client id
    Rejected,
}

/// Result of [`Session::transfer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// `Done` or `FinalFail`
    pub state: SessionState,
    /// File sends made
    pub attempts: u32,
    /// Plaintext checksum computed locally
    pub local_checksum: u32,
    /// Checksum the server last reported
    pub server_checksum: u32,
    /// Filename the server stored under
    pub filename: String,
}

/// Result of [`Session::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// State the session stopped in
    pub state: SessionState,
    /// Identity used, if registration produced one
    pub identity: Option<ClientIdentity>,
    /// Upload result, if the session got that far
    pub transfer: Option<TransferOutcome>,
}

/// Hooks for watching an upload
pub trait TransferObserver {
    /// A file send of `bytes` encrypted bytes is starting
    fn on_send(&mut self, _attempt: u32, _bytes: u64) {}

    /// The file was written to the transport
    fn on_sent(&mut self, _attempt: u32) {}

    /// The server reported its checksum
    fn on_checksum(&mut self, _attempt: u32, _local: u32, _server: u32) {}
}

/// A protocol session over one transport
pub struct Session<T: Transport, S: IdentityStore> {
    transport: T,
    store: S,
    state: SessionState,
    counters: SessionCounters,
    client_id: Option<ClientId>,
    observer: Option<Box<dyn TransferObserver>>,
}

impl<S: IdentityStore> Session<TcpTransport, S> {
    /// Connect to the server named in `info`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the connection cannot be made.
    pub fn connect(info: &TransferInfo, config: &TransportConfig, store: S) -> Result<Self, Error> {
        let addr = info.endpoint.socket_addr();
        tracing::info!("Connecting to {}", addr);
        let transport = TcpTransport::connect(addr, config)?;
        if let Some(peer) = transport.peer_addr() {
            tracing::debug!("Connected to {}", peer);
        }
        Ok(Self::new(transport, store))
    }
}

impl<T: Transport, S: IdentityStore> Session<T, S> {
    /// Start a session over an established transport
    pub fn new(transport: T, store: S) -> Self {
        tracing::debug!(
            "Session state transition: {:?} -> {:?}",
            SessionState::Init,
            SessionState::Connected
        );
        Self {
            transport,
            store,
            state: SessionState::Connected,
            counters: SessionCounters::default(),
            client_id: None,
            observer: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Retry counters
    #[must_use]
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Client id known to this session, if any
    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Underlying transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Identity store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Watch uploads
    pub fn set_observer(&mut self, observer: Box<dyn TransferObserver>) {
        self.observer = Some(observer);
    }

    /// Check if a state transition is valid
    #[must_use]
    pub fn can_transition(&self, to: SessionState) -> bool {
        use SessionState::*;
        match (self.state, to) {
            (Disconnected, _) => false,
            (_, Disconnected) => true,

            (Init, Connected) => true,
            (Connected, Registering) => true,
            (Registering, Registered | RegistrationFailed) => true,
            (Registered | RegistrationFailed, ExchangingKeys) => true,
            (ExchangingKeys, KeysReady | KeyExchangeFailed) => true,
            (KeysReady, Transferring) => true,
            (Transferring, AwaitingChecksum) => true,
            (AwaitingChecksum, Transferring | Done | FinalFail) => true,

            _ => false,
        }
    }

    /// Transition to a new state
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the transition is not allowed
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<(), SessionError> {
        if !self.can_transition(new_state) {
            return Err(SessionError::InvalidState {
                from: self.state,
                to: new_state,
            });
        }

        let old_state = self.state;
        self.state = new_state;

        tracing::debug!(
            "Session state transition: {:?} -> {:?}",
            old_state,
            new_state
        );

        Ok(())
    }

    /// Register `name` with the server.
    ///
    /// On acceptance the identity record is written if none exists; an
    /// existing valid record keeps its id. On refusal, a valid existing
    /// record is offered as a returning identity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless freshly connected, a
    /// transport or wire error, `SessionError::UnexpectedResponse`, or a
    /// persistence error writing the record.
    pub fn register(&mut self, name: &DisplayName) -> Result<Registration, Error> {
        self.transition_to(SessionState::Registering)?;
        tracing::info!("Registering as {:?}", name.as_str());
        self.send(&Request::register(name.as_str()))?;

        let (response, code) = self.await_response("registering")?;
        match code {
            ResponseCode::RegistrationOk => {
                let assigned = ClientIdentity::new(name.clone(), response.client_id);
                let (identity, saved) = if self.store.exists() {
                    match self.store.load() {
                        Ok(Some(record)) => (record.identity, false),
                        Ok(None) => (assigned, false),
                        Err(e) => {
                            tracing::warn!("Existing identity record unusable: {}", e);
                            (assigned, false)
                        }
                    }
                } else {
                    let saved = self.store.save_identity(&assigned)?;
                    (assigned, saved)
                };

                self.client_id = Some(identity.id);
                self.transition_to(SessionState::Registered)?;
                tracing::info!("Registered with client id {}", identity.id);
                Ok(Registration::Accepted { identity, saved })
            }
            ResponseCode::RegistrationError => {
                self.transition_to(SessionState::RegistrationFailed)?;
                let returning = match self.store.load() {
                    Ok(record) => record.map(|r| r.identity),
                    Err(e) => {
                        tracing::warn!("Identity record unusable: {}", e);
                        None
                    }
                };
                match &returning {
                    Some(identity) => {
                        tracing::info!(
                            "Registration refused, continuing with stored id {}",
                            identity.id
                        );
                        self.client_id = Some(identity.id);
                    }
                    None => tracing::warn!("Registration refused"),
                }
                Ok(Registration::Rejected { returning })
            }
            other => Err(self.unexpected("registering", other)),
        }
    }

    /// Send a fresh public key and receive the transfer key.
    ///
    /// The encoded private key is stored in the identity record if it has
    /// none yet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRegistered` for the all-zero id,
    /// `SessionError::InvalidState` unless registration has finished, a
    /// crypto error if key generation or unwrapping fails, a
    /// transport, wire or persistence error, or
    /// `SessionError::UnexpectedResponse`.
    pub fn exchange_keys(&mut self, identity: &ClientIdentity) -> Result<KeyExchange, Error> {
        if identity.id.is_zero() {
            return Err(SessionError::NotRegistered.into());
        }
        self.transition_to(SessionState::ExchangingKeys)?;
        self.client_id = Some(identity.id);

        let keypair = KeyPair::generate()?;
        let private_der = keypair.to_pkcs8_der()?;
        let encoded = Zeroizing::new(encoding::encode(&private_der));
        self.store.save_private_key(&encoded)?;

        let public_key = keypair.public_key().to_der()?;
        let request =
            Request::send_public_key(identity.id, identity.name.as_str(), &public_key);
        if request.payload.len() != NAME_SIZE + PUBLIC_KEY_SIZE {
            return Err(ValidationError::InvalidLength {
                what: "public key payload",
                expected: NAME_SIZE + PUBLIC_KEY_SIZE,
                actual: request.payload.len(),
            }
            .into());
        }
        self.send(&request)?;

        let (response, code) = self.await_response("exchanging keys")?;
        match code {
            ResponseCode::SwitchingKeys => match keypair.unwrap_transfer_key(&response.payload) {
                Ok(transfer_key) => {
                    self.transition_to(SessionState::KeysReady)?;
                    tracing::info!("Transfer key received");
                    Ok(KeyExchange::Ready(KeyMaterial::new(transfer_key)))
                }
                Err(e) => {
                    self.transition_to(SessionState::KeyExchangeFailed)?;
                    Err(e.into())
                }
            },
            ResponseCode::RegistrationError => {
                self.transition_to(SessionState::KeyExchangeFailed)?;
                tracing::warn!("Server does not recognize client id {}", identity.id);
                Ok(KeyExchange::Rejected)
            }
            other => Err(self.unexpected("exchanging keys", other)),
        }
    }

    /// Upload the file at `path`, resending on checksum mismatch up to
    /// [`MAX_ATTEMPTS`] sends in total.
    ///
    /// The file is reloaded, checksummed and encrypted again for every
    /// send. Counters are reset on every exit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless keys are ready, a
    /// persistence error if the file cannot be loaded, a transport or wire
    /// error, or `SessionError::UnexpectedResponse`.
    pub fn transfer(
        &mut self,
        client_id: ClientId,
        keys: &KeyMaterial,
        path: &Path,
    ) -> Result<TransferOutcome, Error> {
        if !self.can_transition(SessionState::Transferring) {
            return Err(SessionError::InvalidState {
                from: self.state,
                to: SessionState::Transferring,
            }
            .into());
        }
        let result = self.transfer_attempts(client_id, keys, path);
        self.counters.reset();
        result
    }

    fn transfer_attempts(
        &mut self,
        client_id: ClientId,
        keys: &KeyMaterial,
        path: &Path,
    ) -> Result<TransferOutcome, Error> {
        loop {
            let attempt = self.counters.attempt;
            let source = SourceFile::load(path)?;
            let item = TransferItem::prepare(client_id, &source, keys.transfer_key());
            self.counters.last_checksum = Some(item.checksum());

            self.transition_to(SessionState::Transferring)?;
            tracing::info!(
                "Sending {} (attempt {}/{})",
                item.filename(),
                attempt,
                MAX_ATTEMPTS
            );

            let mut message = Request::new(client_id, RequestCode::SendFile).encode()?;
            message.extend_from_slice(&item.encode()?);
            if let Some(observer) = self.observer.as_mut() {
                observer.on_send(attempt, item.content().len() as u64);
            }
            self.transport.send_all(&message)?;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_sent(attempt);
            }
            self.transition_to(SessionState::AwaitingChecksum)?;

            let (response, code) = self.await_response("awaiting checksum")?;
            if code != ResponseCode::ChecksumReady {
                return Err(self.unexpected("awaiting checksum", code));
            }
            let report = ChecksumReport::for_response(&response, &mut self.transport)?;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_checksum(attempt, item.checksum(), report.checksum);
            }

            let outcome = |state| TransferOutcome {
                state,
                attempts: attempt,
                local_checksum: item.checksum(),
                server_checksum: report.checksum,
                filename: report.filename.clone(),
            };

            if report.checksum == item.checksum() {
                tracing::info!("Checksum {} matched", report.checksum);
                self.send(&Request::checksum_outcome(
                    client_id,
                    RequestCode::ChecksumOk,
                    &report.filename,
                ))?;
                self.await_ack("confirming checksum")?;
                self.transition_to(SessionState::Done)?;
                return Ok(outcome(SessionState::Done));
            }

            if attempt < MAX_ATTEMPTS {
                tracing::warn!(
                    "Checksum mismatch (local {}, server {}), resending",
                    item.checksum(),
                    report.checksum
                );
                self.send(&Request::checksum_outcome(
                    client_id,
                    RequestCode::ChecksumError,
                    &report.filename,
                ))?;
                self.counters.attempt += 1;
                continue;
            }

            tracing::warn!(
                "Checksum mismatch on attempt {}, giving up",
                MAX_ATTEMPTS
            );
            self.send(&Request::checksum_outcome(
                client_id,
                RequestCode::ChecksumErrorFinal,
                &report.filename,
            ))?;
            self.await_ack("reporting final checksum failure")?;
            self.transition_to(SessionState::FinalFail)?;
            return Ok(outcome(SessionState::FinalFail));
        }
    }

    /// Announce termination and close the transport. No response is read.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if already disconnected, or a
    /// transport error.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if !self.can_transition(SessionState::Disconnected) {
            return Err(SessionError::InvalidState {
                from: self.state,
                to: SessionState::Disconnected,
            }
            .into());
        }
        let client_id = self.client_id.unwrap_or(ClientId::ZERO);
        let sent = self.send(&Request::new(client_id, RequestCode::Disconnect));
        let closed = self.transport.close();
        let stats = self.transport.stats();
        tracing::debug!(
            "Disconnected: {} bytes sent, {} received",
            stats.bytes_sent,
            stats.bytes_received
        );
        self.transition_to(SessionState::Disconnected)?;
        sent?;
        closed?;
        Ok(())
    }

    /// Register, exchange keys and upload the configured file.
    ///
    /// Refusals are reported in the returned state rather than as errors.
    ///
    /// # Errors
    ///
    /// Returns the first error any step returns.
    pub fn run(&mut self, info: &TransferInfo) -> Result<SessionReport, Error> {
        let path = info.require_file()?.to_path_buf();

        let identity = match self.register(&info.client_name)? {
            Registration::Accepted { identity, .. } => identity,
            Registration::Rejected {
                returning: Some(identity),
            } => identity,
            Registration::Rejected { returning: None } => {
                return Ok(self.report(None, None));
            }
        };

        let keys = match self.exchange_keys(&identity)? {
            KeyExchange::Ready(keys) => keys,
            KeyExchange::Rejected => return Ok(self.report(Some(identity), None)),
        };

        let outcome = self.transfer(identity.id, &keys, &path)?;
        Ok(self.report(Some(identity), Some(outcome)))
    }

    /// Consume the session, returning transport and store
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.store)
    }

    fn report(
        &self,
        identity: Option<ClientIdentity>,
        transfer: Option<TransferOutcome>,
    ) -> SessionReport {
        SessionReport {
            state: self.state,
            identity,
            transfer,
        }
    }

    fn send(&mut self, request: &Request) -> Result<(), Error> {
        let bytes = request.encode()?;
        tracing::debug!(
            "Sending request code {} ({} bytes)",
            request.code.as_u16(),
            bytes.len()
        );
        self.transport.send_all(&bytes)?;
        Ok(())
    }

    /// Read responses until one with a known code arrives
    ///
    /// Unknown codes are skipped; a silent server is bounded by the
    /// transport read timeout.
    fn await_response(&mut self, step: &'static str) -> Result<(Response, ResponseCode), Error> {
        loop {
            let response = Response::read_from(&mut self.transport)?;
            match response.code() {
                Some(code) => return Ok((response, code)),
                None => tracing::warn!(
                    "Ignoring unknown response code {} while {}",
                    response.code,
                    step
                ),
            }
        }
    }

    fn await_ack(&mut self, step: &'static str) -> Result<(), Error> {
        match self.await_response(step)? {
            (_, ResponseCode::MessageReceived) => Ok(()),
            (_, other) => Err(self.unexpected(step, other)),
        }
    }

    fn unexpected(&self, step: &'static str, code: ResponseCode) -> Error {
        tracing::warn!("Unexpected response {:?} while {}", code, step);
        SessionError::UnexpectedResponse {
            step,
            code: code.as_u16(),
        }
        .into()
    }
}
