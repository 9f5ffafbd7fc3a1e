//! In-memory scripted transport.
//!
//! Replays a pre-loaded byte script as the "server" side and records
//! everything written to it. Reading past the end of the script behaves
//! like the peer closing the connection.

use crate::transport::{Transport, TransportError, TransportResult, TransportStats};
use std::collections::VecDeque;

/// Transport backed by in-memory buffers
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    closed: bool,
    stats: TransportStats,
}

impl ScriptedTransport {
    /// Create an empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose peer will send `script`
    #[must_use]
    pub fn with_script(script: &[u8]) -> Self {
        let mut transport = Self::new();
        transport.push_inbound(script);
        transport
    }

    /// Queue more bytes for the client to read
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Everything written so far
    #[must_use]
    pub fn sent(&self) -> &[u8] {
        &self.outbound
    }

    /// Script bytes not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for ScriptedTransport {
    fn send_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        if self.closed {
            self.stats.record_send_error();
            return Err(TransportError::Closed);
        }
        self.outbound.extend_from_slice(buf);
        self.stats.record_send(buf.len());
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        if self.closed || self.inbound.len() < buf.len() {
            self.stats.record_recv_error();
            return Err(TransportError::Closed);
        }
        let n = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        self.stats.record_recv(n);
        Ok(())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_replay() {
        let mut transport = ScriptedTransport::with_script(b"abcdef");

        let mut buf = [0u8; 4];
        transport.recv_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        assert_eq!(transport.remaining(), 2);
        assert_eq!(transport.stats().bytes_received, 4);

        let mut buf = [0u8; 3];
        assert!(matches!(
            transport.recv_exact(&mut buf),
            Err(TransportError::Closed)
        ));
        // Failed read consumes nothing
        assert_eq!(transport.remaining(), 2);
    }

    #[test]
    fn test_records_sends() {
        let mut transport = ScriptedTransport::new();
        transport.send_all(b"one").unwrap();
        transport.send_all(b"two").unwrap();

        assert_eq!(transport.sent(), b"onetwo");
        assert_eq!(transport.stats().sends, 2);
    }

    #[test]
    fn test_close() {
        let mut transport = ScriptedTransport::with_script(b"x");
        transport.close().unwrap();

        assert!(transport.is_closed());
        assert!(transport.send_all(b"y").is_err());
        assert!(transport.recv_exact(&mut [0u8; 1]).is_err());
    }

    #[test]
    fn test_through_mut_ref() {
        fn exchange<T: Transport>(mut transport: T) -> u8 {
            transport.send_all(b"q").unwrap();
            let mut buf = [0u8; 1];
            transport.recv_exact(&mut buf).unwrap();
            buf[0]
        }

        let mut transport = ScriptedTransport::with_script(b"z");
        assert_eq!(exchange(&mut transport), b'z');
        assert_eq!(transport.sent(), b"q");
    }
}
