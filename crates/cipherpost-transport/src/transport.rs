//! Transport trait abstraction.
//!
//! The protocol engine needs exactly one thing from the network: a
//! blocking byte stream it can write whole buffers to and read exact
//! lengths from. Anything that provides that (a TCP socket, an in-memory
//! script) implements [`Transport`].

use std::io;
use std::net::SocketAddr;

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error from underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport is closed, or the peer closed it mid-message
    #[error("Transport is closed")]
    Closed,

    /// Connection failed
    #[error("Connection to {addr} failed: {reason}")]
    ConnectionFailed {
        /// Address we tried to reach
        addr: SocketAddr,
        /// Failure reason
        reason: String,
    },

    /// A read or write exceeded its timeout
    #[error("Operation timed out")]
    Timeout,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Classify an I/O error from a read or write
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Blocking stream transport.
///
/// One request/response pair is in flight at a time, so implementations
/// need no internal synchronization.
pub trait Transport {
    /// Write the whole buffer.
    ///
    /// # Errors
    /// Returns `TransportError` if the write fails or times out
    fn send_all(&mut self, buf: &[u8]) -> TransportResult<()>;

    /// Fill the whole buffer.
    ///
    /// # Errors
    /// Returns `TransportError::Closed` if the stream ends first, or another
    /// `TransportError` if the read fails or times out
    fn recv_exact(&mut self, buf: &mut [u8]) -> TransportResult<()>;

    /// Close the transport. Further sends and receives return
    /// `TransportError::Closed`.
    ///
    /// # Errors
    /// Returns `TransportError` if closing fails
    fn close(&mut self) -> TransportResult<()>;

    /// Check if the transport is closed.
    fn is_closed(&self) -> bool;

    /// Remote address, if the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Get transport statistics.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        (**self).send_all(buf)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        (**self).recv_exact(buf)
    }

    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        (**self).peer_addr()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Transport statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Completed `send_all` calls
    pub sends: u64,
    /// Completed `recv_exact` calls
    pub receives: u64,
    /// Send errors
    pub send_errors: u64,
    /// Receive errors
    pub recv_errors: u64,
}

impl TransportStats {
    /// Create new empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful send
    pub fn record_send(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.sends += 1;
    }

    /// Record a successful receive
    pub fn record_recv(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.receives += 1;
    }

    /// Record a send error
    pub fn record_send_error(&mut self) {
        self.send_errors += 1;
    }

    /// Record a receive error
    pub fn record_recv_error(&mut self) {
        self.recv_errors += 1;
    }
}
