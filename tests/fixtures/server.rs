//! In-process upload server for integration testing
//!
//! Speaks the server side of the protocol over a real TCP socket on a
//! background thread: assigns client ids, wraps a fresh transfer key under
//! the client's public key, decrypts uploads and reports their checksum.
//! Connections are served one after another.
//!
//! # Example
//!
//! ```no_run
//! use cipherpost_integration_tests::fixtures::{ServerBehavior, TestServer};
//!
//! let server = TestServer::spawn(ServerBehavior::default()).unwrap();
//! let lines = server.info_lines("alice", "upload.txt");
//! // ... write transfer.info, run a session ...
//! assert_eq!(server.log().uploads.len(), 1);
//! ```

use cipherpost_core::wire::{ChecksumReport, FileHeader, RequestHeader, Response, decode_name};
use cipherpost_core::{
    CLIENT_VERSION, ClientId, FILE_HEADER_SIZE, NAME_SIZE, REQUEST_HEADER_SIZE, RequestCode,
    ResponseCode,
};
use cipherpost_crypto::{PublicKey, TransferKey};
use cipherpost_files::cksum;
use rand::RngCore;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// Response code outside the protocol, sent to exercise skipping
pub const UNKNOWN_CODE: u16 = 2999;

/// How the server misbehaves
#[derive(Debug, Clone, Default)]
pub struct ServerBehavior {
    /// Leading checksum reports to corrupt; `usize::MAX` corrupts all
    pub mismatches: usize,
    /// Answer every key exchange with a registration error
    pub refuse_key_exchange: bool,
    /// Unknown-code responses to send ahead of every real response
    pub unknown_before_each: usize,
}

/// Everything the server saw
#[derive(Debug, Clone, Default)]
pub struct ServerLog {
    /// Raw request codes in arrival order
    pub requests: Vec<u16>,
    /// Names that registered successfully
    pub registered: Vec<String>,
    /// Decrypted uploads, keyed by the stored (lowercased) filename
    pub uploads: Vec<(String, Vec<u8>)>,
    /// Checksum outcome codes with the filename they named
    pub outcomes: Vec<(u16, String)>,
    /// Client ids seen in disconnect requests
    pub disconnects: Vec<ClientId>,
}

#[derive(Default)]
struct ServerState {
    behavior: ServerBehavior,
    names: HashMap<String, ClientId>,
    keys: HashMap<ClientId, TransferKey>,
    corrupted: usize,
}

/// Handle to a running test server
pub struct TestServer {
    addr: SocketAddr,
    log: Arc<Mutex<ServerLog>>,
}

impl TestServer {
    /// Bind to an ephemeral localhost port and start serving
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub fn spawn(behavior: ServerBehavior) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let log = Arc::new(Mutex::new(ServerLog::default()));

        let server_log = Arc::clone(&log);
        thread::spawn(move || {
            let mut state = ServerState {
                behavior,
                ..ServerState::default()
            };
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                if let Err(e) = serve(stream, &mut state, &server_log) {
                    tracing::debug!("Test server connection ended: {}", e);
                }
            }
        });

        Ok(Self { addr, log })
    }

    /// Listening address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Snapshot of the log
    #[must_use]
    pub fn log(&self) -> ServerLog {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// `transfer.info` lines pointing at this server
    #[must_use]
    pub fn info_lines(&self, name: &str, file: &str) -> Vec<String> {
        vec![self.addr.to_string(), name.to_string(), file.to_string()]
    }
}

fn invalid(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

fn record(log: &Mutex<ServerLog>, f: impl FnOnce(&mut ServerLog)) {
    if let Ok(mut log) = log.lock() {
        f(&mut log);
    }
}

fn respond(
    stream: &mut TcpStream,
    state: &ServerState,
    code: ResponseCode,
    client_id: ClientId,
    payload: Vec<u8>,
) -> io::Result<()> {
    for _ in 0..state.behavior.unknown_before_each {
        let noise = Response::new(CLIENT_VERSION, UNKNOWN_CODE, client_id, vec![0xEE; 8]);
        stream.write_all(&noise.encode().map_err(invalid)?)?;
    }
    let response = Response::new(CLIENT_VERSION, code.as_u16(), client_id, payload);
    stream.write_all(&response.encode().map_err(invalid)?)
}

fn read_vec(stream: &mut TcpStream, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

fn serve(
    mut stream: TcpStream,
    state: &mut ServerState,
    log: &Mutex<ServerLog>,
) -> io::Result<()> {
    loop {
        let mut header = [0u8; REQUEST_HEADER_SIZE];
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }
        let header = RequestHeader::decode(&header).map_err(invalid)?;
        let code = header.request_code().map_err(invalid)?;
        let payload = read_vec(&mut stream, header.payload_size as usize)?;
        let filename = if code.carries_filename() {
            Some(decode_name(&read_vec(&mut stream, NAME_SIZE)?))
        } else {
            None
        };
        record(log, |log| log.requests.push(header.code));
        let id = header.client_id;

        match code {
            RequestCode::Disconnect => {
                record(log, |log| log.disconnects.push(id));
                return Ok(());
            }
            RequestCode::Register => {
                let name = decode_name(&payload);
                if state.names.contains_key(&name) {
                    respond(&mut stream, state, ResponseCode::RegistrationError, ClientId::ZERO, Vec::new())?;
                } else {
                    let mut bytes = [0u8; 16];
                    rand::thread_rng().fill_bytes(&mut bytes);
                    let assigned = ClientId::from_bytes(bytes);
                    state.names.insert(name.clone(), assigned);
                    record(log, |log| log.registered.push(name));
                    respond(&mut stream, state, ResponseCode::RegistrationOk, assigned, Vec::new())?;
                }
            }
            RequestCode::SendPublicKey => {
                let known = state.names.values().any(|&known| known == id);
                if state.behavior.refuse_key_exchange || !known {
                    respond(&mut stream, state, ResponseCode::RegistrationError, id, Vec::new())?;
                    continue;
                }
                let public = PublicKey::from_der(&payload[NAME_SIZE..]).map_err(invalid)?;
                let key = TransferKey::generate().map_err(invalid)?;
                let wrapped = public.wrap_transfer_key(&key).map_err(invalid)?;
                state.keys.insert(id, key);
                respond(&mut stream, state, ResponseCode::SwitchingKeys, id, wrapped)?;
            }
            RequestCode::SendFile => {
                let file = FileHeader::decode(&read_vec(&mut stream, FILE_HEADER_SIZE)?)
                    .map_err(invalid)?;
                let name = decode_name(&read_vec(&mut stream, NAME_SIZE)?);
                let content = read_vec(&mut stream, file.content_size as usize)?;

                let key = state
                    .keys
                    .get(&file.client_id)
                    .ok_or_else(|| invalid("upload before key exchange"))?;
                let plain = key.decrypt(&content).map_err(invalid)?;

                let mut checksum = cksum(&plain);
                if state.corrupted < state.behavior.mismatches {
                    checksum = checksum.wrapping_add(1);
                    state.corrupted += 1;
                }

                let stored = name.to_lowercase();
                let report = ChecksumReport {
                    content_size: plain.len() as u32,
                    filename: stored.clone(),
                    checksum,
                };
                record(log, |log| log.uploads.push((stored, plain)));

                respond(&mut stream, state, ResponseCode::ChecksumReady, id, Vec::new())?;
                stream.write_all(&report.encode())?;
            }
            RequestCode::ChecksumOk | RequestCode::ChecksumErrorFinal => {
                let name = filename.unwrap_or_default();
                record(log, |log| log.outcomes.push((header.code, name)));
                respond(&mut stream, state, ResponseCode::MessageReceived, id, Vec::new())?;
            }
            RequestCode::ChecksumError => {
                let name = filename.unwrap_or_default();
                record(log, |log| log.outcomes.push((header.code, name)));
            }
        }
    }
}
