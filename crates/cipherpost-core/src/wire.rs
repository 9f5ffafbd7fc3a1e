//! Wire encoding and decoding.
//!
//! Every structure is written field by field in little-endian order with
//! no padding, so the byte layout never depends on in-memory
//! representation.
//!
//! ```text
//! Request:   client_id[16] version[1] code[2] payload_size[4] payload[payload_size]
//!            filename[255]               (checksum outcome codes only)
//! Response:  version[1] code[2] payload_size[4] client_id[16] payload[payload_size]
//! File:      client_id[16] content_size[4] filename[255] content[content_size]
//! Checksum:  content_size[4] filename[255] checksum[4]
//! ```
//!
//! Name and filename fields are exactly 255 bytes: shorter values are
//! padded with NUL, longer ones truncated, and decoding stops at the first
//! NUL.

use crate::error::{Error, ValidationError, WireError};
use crate::identity::ClientId;
use crate::{
    CHECKSUM_REPORT_SIZE, CLIENT_ID_SIZE, CLIENT_VERSION, FILE_HEADER_SIZE, NAME_SIZE,
    REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE,
};
use cipherpost_transport::Transport;

/// Largest response payload this client will allocate for
pub const MAX_RESPONSE_PAYLOAD: u32 = 64 * 1024;

/// Client-to-server operation codes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestCode {
    /// Announce termination
    Disconnect = 0,
    /// Register a display name
    Register = 1100,
    /// Send the public key, ask for a transfer key
    SendPublicKey = 1101,
    /// Upload an encrypted file
    SendFile = 1103,
    /// Server checksum matched
    ChecksumOk = 1104,
    /// Server checksum mismatched, file follows again
    ChecksumError = 1105,
    /// Server checksum mismatched on the last attempt
    ChecksumErrorFinal = 1106,
}

impl RequestCode {
    /// Raw wire value
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// True for the codes followed by a 255-byte filename block
    #[must_use]
    pub fn carries_filename(self) -> bool {
        matches!(
            self,
            Self::ChecksumOk | Self::ChecksumError | Self::ChecksumErrorFinal
        )
    }
}

impl TryFrom<u16> for RequestCode {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disconnect),
            1100 => Ok(Self::Register),
            1101 => Ok(Self::SendPublicKey),
            1103 => Ok(Self::SendFile),
            1104 => Ok(Self::ChecksumOk),
            1105 => Ok(Self::ChecksumError),
            1106 => Ok(Self::ChecksumErrorFinal),
            _ => Err(WireError::UnknownRequestCode(value)),
        }
    }
}

/// Server-to-client outcome codes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// Registration accepted, payload-free, client id assigned
    RegistrationOk = 2100,
    /// Registration refused, or client id unknown to the server
    RegistrationError = 2101,
    /// Payload is the wrapped transfer key
    SwitchingKeys = 2102,
    /// Upload stored, checksum report follows
    ChecksumReady = 2103,
    /// Acknowledgement
    MessageReceived = 2104,
}

impl ResponseCode {
    /// Decode a raw code. Unknown codes give `None`: the protocol ignores
    /// them rather than failing.
    #[must_use]
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            2100 => Some(Self::RegistrationOk),
            2101 => Some(Self::RegistrationError),
            2102 => Some(Self::SwitchingKeys),
            2103 => Some(Self::ChecksumReady),
            2104 => Some(Self::MessageReceived),
            _ => None,
        }
    }

    /// Raw wire value
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

fn ensure_len(what: &'static str, data: &[u8], expected: usize) -> Result<(), WireError> {
    if data.len() < expected {
        return Err(WireError::MalformedHeader {
            what,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn read_client_id(data: &[u8]) -> ClientId {
    let mut id = [0u8; CLIENT_ID_SIZE];
    id.copy_from_slice(&data[..CLIENT_ID_SIZE]);
    ClientId::from_bytes(id)
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Encode a name or filename as a fixed 255-byte field
#[must_use]
pub fn encode_name(name: &str) -> [u8; NAME_SIZE] {
    let mut field = [0u8; NAME_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_SIZE);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// Decode a name field: everything up to the first NUL
#[must_use]
pub fn decode_name(field: &[u8]) -> String {
    let field = &field[..field.len().min(NAME_SIZE)];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Fixed 23-byte request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Sender id (all zero before registration)
    pub client_id: ClientId,
    /// Client protocol version
    pub version: u8,
    /// Raw operation code
    pub code: u16,
    /// Payload length in bytes
    pub payload_size: u32,
}

impl RequestHeader {
    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut buf = [0u8; REQUEST_HEADER_SIZE];
        buf[..16].copy_from_slice(self.client_id.as_bytes());
        buf[16] = self.version;
        buf[17..19].copy_from_slice(&self.code.to_le_bytes());
        buf[19..23].copy_from_slice(&self.payload_size.to_le_bytes());
        buf
    }

    /// Decode from wire bytes
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if `data` is shorter than 23 bytes.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        ensure_len("request header", data, REQUEST_HEADER_SIZE)?;
        Ok(Self {
            client_id: read_client_id(data),
            version: data[16],
            code: read_u16(data, 17),
            payload_size: read_u32(data, 19),
        })
    }

    /// Typed operation code
    ///
    /// # Errors
    ///
    /// Returns `WireError::UnknownRequestCode` for codes outside the protocol.
    pub fn request_code(&self) -> Result<RequestCode, WireError> {
        RequestCode::try_from(self.code)
    }
}

/// A client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Sender id
    pub client_id: ClientId,
    /// Client protocol version
    pub version: u8,
    /// Operation
    pub code: RequestCode,
    /// Payload
    pub payload: Vec<u8>,
    /// Filename block, present for checksum outcome codes
    pub filename: Option<String>,
}

impl Request {
    /// Create a request with no payload
    #[must_use]
    pub fn new(client_id: ClientId, code: RequestCode) -> Self {
        Self {
            client_id,
            version: CLIENT_VERSION,
            code,
            payload: Vec::new(),
            filename: None,
        }
    }

    /// Registration: the display name as a 255-byte field, zero client id
    #[must_use]
    pub fn register(name: &str) -> Self {
        Self::new(ClientId::ZERO, RequestCode::Register).with_payload(encode_name(name).to_vec())
    }

    /// Key exchange: name field followed by the encoded public key
    #[must_use]
    pub fn send_public_key(client_id: ClientId, name: &str, public_key: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(NAME_SIZE + public_key.len());
        payload.extend_from_slice(&encode_name(name));
        payload.extend_from_slice(public_key);
        Self::new(client_id, RequestCode::SendPublicKey).with_payload(payload)
    }

    /// Checksum outcome with the filename the server reported
    #[must_use]
    pub fn checksum_outcome(client_id: ClientId, code: RequestCode, filename: &str) -> Self {
        let mut request = Self::new(client_id, code);
        request.filename = Some(filename.to_string());
        request
    }

    /// Set the payload
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Header for this request
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ContentTooLarge` if the payload does not
    /// fit the 32-bit size field.
    pub fn header(&self) -> Result<RequestHeader, Error> {
        let payload_size = u32::try_from(self.payload.len())
            .map_err(|_| ValidationError::ContentTooLarge(self.payload.len()))?;
        Ok(RequestHeader {
            client_id: self.client_id,
            version: self.version,
            code: self.code.as_u16(),
            payload_size,
        })
    }

    /// Encode header, payload and (for checksum outcomes) the filename block
    ///
    /// # Errors
    ///
    /// See [`header`](Self::header).
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let header = self.header()?;
        let mut buf = Vec::with_capacity(REQUEST_HEADER_SIZE + self.payload.len() + NAME_SIZE);
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&self.payload);
        if self.code.carries_filename() {
            buf.extend_from_slice(&encode_name(self.filename.as_deref().unwrap_or_default()));
        }
        Ok(buf)
    }

    /// Decode a complete request from a buffer. File uploads are decoded
    /// only up to the header; the file block is read with [`FileHeader`].
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if the buffer is shorter than
    /// the layout requires, or `WireError::UnknownRequestCode`.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let header = RequestHeader::decode(data)?;
        let code = header.request_code()?;
        let payload_end = REQUEST_HEADER_SIZE + header.payload_size as usize;
        ensure_len("request payload", data, payload_end)?;

        let filename = if code.carries_filename() {
            ensure_len("request filename", data, payload_end + NAME_SIZE)?;
            Some(decode_name(&data[payload_end..payload_end + NAME_SIZE]))
        } else {
            None
        };

        Ok(Self {
            client_id: header.client_id,
            version: header.version,
            code,
            payload: data[REQUEST_HEADER_SIZE..payload_end].to_vec(),
            filename,
        })
    }
}

/// Fixed 7-byte response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Server protocol version
    pub version: u8,
    /// Raw outcome code
    pub code: u16,
    /// Payload length in bytes
    pub payload_size: u32,
}

impl ResponseHeader {
    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> [u8; RESPONSE_HEADER_SIZE] {
        let mut buf = [0u8; RESPONSE_HEADER_SIZE];
        buf[0] = self.version;
        buf[1..3].copy_from_slice(&self.code.to_le_bytes());
        buf[3..7].copy_from_slice(&self.payload_size.to_le_bytes());
        buf
    }

    /// Decode from wire bytes
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if `data` is shorter than 7 bytes.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        ensure_len("response header", data, RESPONSE_HEADER_SIZE)?;
        Ok(Self {
            version: data[0],
            code: read_u16(data, 1),
            payload_size: read_u32(data, 3),
        })
    }
}

/// A server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Server protocol version
    pub version: u8,
    /// Raw outcome code; see [`Response::code`]
    pub code: u16,
    /// Client id block
    pub client_id: ClientId,
    /// Payload
    pub payload: Vec<u8>,
}

impl Response {
    /// Create a response
    #[must_use]
    pub fn new(version: u8, code: u16, client_id: ClientId, payload: Vec<u8>) -> Self {
        Self {
            version,
            code,
            client_id,
            payload,
        }
    }

    /// Typed outcome, `None` for codes this client does not know
    #[must_use]
    pub fn code(&self) -> Option<ResponseCode> {
        ResponseCode::from_raw(self.code)
    }

    /// Header for this response
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ContentTooLarge` if the payload does not
    /// fit the 32-bit size field, or `WireError::PayloadTooLarge` if it is
    /// larger than a client would accept.
    pub fn header(&self) -> Result<ResponseHeader, Error> {
        let payload_size = u32::try_from(self.payload.len())
            .map_err(|_| ValidationError::ContentTooLarge(self.payload.len()))?;
        check_payload_size(payload_size)?;
        Ok(ResponseHeader {
            version: self.version,
            code: self.code,
            payload_size,
        })
    }

    /// Encode header, client id and payload
    ///
    /// # Errors
    ///
    /// See [`header`](Self::header).
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let header = self.header()?;
        let mut buf =
            Vec::with_capacity(RESPONSE_HEADER_SIZE + CLIENT_ID_SIZE + self.payload.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(self.client_id.as_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode a complete response from a buffer
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if the buffer is shorter than
    /// the declared layout, or `WireError::PayloadTooLarge`.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let header = ResponseHeader::decode(data)?;
        check_payload_size(header.payload_size)?;
        let id_end = RESPONSE_HEADER_SIZE + CLIENT_ID_SIZE;
        ensure_len("response client id", data, id_end)?;
        let payload_end = id_end + header.payload_size as usize;
        ensure_len("response payload", data, payload_end)?;

        Ok(Self {
            version: header.version,
            code: header.code,
            client_id: read_client_id(&data[RESPONSE_HEADER_SIZE..]),
            payload: data[id_end..payload_end].to_vec(),
        })
    }

    /// Read one response from a transport
    ///
    /// # Errors
    ///
    /// Returns a transport error if the stream fails, or
    /// `WireError::PayloadTooLarge` for an oversized declared payload.
    pub fn read_from<T: Transport + ?Sized>(transport: &mut T) -> Result<Self, Error> {
        let mut header = [0u8; RESPONSE_HEADER_SIZE];
        transport.recv_exact(&mut header)?;
        let header = ResponseHeader::decode(&header)?;
        check_payload_size(header.payload_size)?;

        let mut id = [0u8; CLIENT_ID_SIZE];
        transport.recv_exact(&mut id)?;

        let mut payload = vec![0u8; header.payload_size as usize];
        transport.recv_exact(&mut payload)?;

        tracing::debug!(
            "Received response code {} ({} byte payload)",
            header.code,
            header.payload_size
        );

        Ok(Self {
            version: header.version,
            code: header.code,
            client_id: ClientId::from_bytes(id),
            payload,
        })
    }
}

fn check_payload_size(size: u32) -> Result<(), WireError> {
    if size > MAX_RESPONSE_PAYLOAD {
        return Err(WireError::PayloadTooLarge {
            size,
            max: MAX_RESPONSE_PAYLOAD,
        });
    }
    Ok(())
}

/// Fixed 20-byte header preceding an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Uploader id
    pub client_id: ClientId,
    /// Encrypted content length
    pub content_size: u32,
}

impl FileHeader {
    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[..16].copy_from_slice(self.client_id.as_bytes());
        buf[16..20].copy_from_slice(&self.content_size.to_le_bytes());
        buf
    }

    /// Decode from wire bytes
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if `data` is shorter than 20 bytes.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        ensure_len("file header", data, FILE_HEADER_SIZE)?;
        Ok(Self {
            client_id: read_client_id(data),
            content_size: read_u32(data, 16),
        })
    }
}

/// Server's report after storing an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumReport {
    /// Decrypted size the server stored
    pub content_size: u32,
    /// Filename the server stored under
    pub filename: String,
    /// `cksum` of the decrypted content
    pub checksum: u32,
}

impl ChecksumReport {
    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> [u8; CHECKSUM_REPORT_SIZE] {
        let mut buf = [0u8; CHECKSUM_REPORT_SIZE];
        buf[..4].copy_from_slice(&self.content_size.to_le_bytes());
        buf[4..4 + NAME_SIZE].copy_from_slice(&encode_name(&self.filename));
        buf[4 + NAME_SIZE..].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Decode from wire bytes
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedHeader` if `data` is shorter than 263 bytes.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        ensure_len("checksum report", data, CHECKSUM_REPORT_SIZE)?;
        Ok(Self {
            content_size: read_u32(data, 0),
            filename: decode_name(&data[4..4 + NAME_SIZE]),
            checksum: read_u32(data, 4 + NAME_SIZE),
        })
    }

    /// Obtain the report for a "checksum ready" response.
    ///
    /// The reference server sends the report after a payload-free
    /// response; a response that carries it as payload is accepted too.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the trailing block cannot be read.
    pub fn for_response<T: Transport + ?Sized>(
        response: &Response,
        transport: &mut T,
    ) -> Result<Self, Error> {
        if response.payload.len() >= CHECKSUM_REPORT_SIZE {
            return Ok(Self::decode(&response.payload)?);
        }
        let mut buf = [0u8; CHECKSUM_REPORT_SIZE];
        transport.recv_exact(&mut buf)?;
        Ok(Self::decode(&buf)?)
    }
}
