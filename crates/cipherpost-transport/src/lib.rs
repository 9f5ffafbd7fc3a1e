//! # cipherpost Transport
//!
//! Network transport layer for the cipherpost client.
//!
//! This crate provides:
//! - The [`Transport`] trait: a blocking, reliable, ordered byte stream
//! - A TCP implementation with connect, read and write timeouts
//! - An in-memory scripted transport for driving the protocol in tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod tcp;
pub mod transport;

pub use memory::ScriptedTransport;
pub use tcp::TcpTransport;
pub use transport::{Transport, TransportError, TransportResult, TransportStats};

use std::time::Duration;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum time to establish the connection
    pub connect_timeout: Duration,
    /// Maximum time a single read may block (`None` = forever)
    pub read_timeout: Option<Duration>,
    /// Maximum time a single write may block (`None` = forever)
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(30)),
            write_timeout: Some(Duration::from_secs(30)),
            nodelay: true,
        }
    }
}
