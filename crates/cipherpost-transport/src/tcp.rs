//! TCP transport.
//!
//! Connects with `socket2` so the connect itself can time out, then hands
//! the socket to `std::net::TcpStream` with read and write timeouts set.

use crate::TransportConfig;
use crate::transport::{Transport, TransportError, TransportResult, TransportStats};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Blocking TCP transport
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    closed: bool,
    stats: TransportStats,
}

impl TcpTransport {
    /// Connect to `addr` using the timeouts in `config`.
    ///
    /// # Errors
    /// Returns `TransportError::InvalidConfig` for a zero connect timeout,
    /// and `TransportError::ConnectionFailed` if the socket cannot be
    /// created, configured or connected.
    pub fn connect(addr: SocketAddr, config: &TransportConfig) -> TransportResult<Self> {
        if config.connect_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "connect timeout must be non-zero".to_string(),
            ));
        }

        let failed = |e: std::io::Error| TransportError::ConnectionFailed {
            addr,
            reason: e.to_string(),
        };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(failed)?;
        socket
            .connect_timeout(&addr.into(), config.connect_timeout)
            .map_err(failed)?;
        socket.set_tcp_nodelay(config.nodelay).map_err(failed)?;

        let stream: TcpStream = socket.into();
        stream.set_read_timeout(config.read_timeout).map_err(failed)?;
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(failed)?;

        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            stream,
            peer: addr,
            closed: false,
            stats: TransportStats::new(),
        })
    }
}

impl Transport for TcpTransport {
    fn send_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.stream.write_all(buf).and_then(|()| self.stream.flush()) {
            Ok(()) => {
                self.stats.record_send(buf.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_send_error();
                Err(TransportError::from_io(e))
            }
        }
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.stream.read_exact(buf) {
            Ok(()) => {
                self.stats.record_recv(buf.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_recv_error();
                Err(TransportError::from_io(e))
            }
        }
    }

    fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already gone
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}
