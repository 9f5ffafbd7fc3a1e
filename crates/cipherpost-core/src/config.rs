//! Transfer configuration record (`transfer.info`).
//!
//! ```text
//! line 1   host:port        e.g. 127.0.0.1:1234
//! line 2   client name      at most 255 bytes, longer is truncated
//! line 3   file to upload   path, relative to the working directory
//! ```
//!
//! The host must be an IP address and the port a number in 0-65535. Each
//! part falls back to its default on its own when invalid, so a record
//! with a bad host and a good port keeps the port.

use crate::error::{Error, ValidationError};
use crate::identity::DisplayName;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use cipherpost_files::LineFile;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

const RECORD: &str = "transfer.info";

/// Line holding `host:port`
pub const ENDPOINT_LINE: usize = 1;
/// Line holding the client name
pub const NAME_LINE: usize = 2;
/// Line holding the upload path
pub const FILE_LINE: usize = 3;

/// Server address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Server IP
    pub host: IpAddr,
    /// Server port
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(DEFAULT_HOST),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    /// Parse `host:port`, falling back per part on invalid input
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (host, port) = match text.rsplit_once(':') {
            // Bare IPv6 without brackets has several colons and no port
            Some((host, _)) if host.contains(':') && !host.starts_with('[') => (text, None),
            Some((host, port)) => (host, Some(port)),
            None => (text, None),
        };
        Self {
            host: parse_host(host),
            port: port.map_or_else(
                || {
                    tracing::warn!("No port in {:?}, using {}", text, DEFAULT_PORT);
                    DEFAULT_PORT
                },
                parse_port,
            ),
        }
    }

    /// Socket address to connect to
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Parse an IP address, `127.0.0.1` if invalid
#[must_use]
pub fn parse_host(text: &str) -> IpAddr {
    let trimmed = text.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid host {:?}, using {}", text, DEFAULT_HOST);
        IpAddr::V4(DEFAULT_HOST)
    })
}

/// Parse a port number in 0-65535, `1234` if invalid
#[must_use]
pub fn parse_port(text: &str) -> u16 {
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(port) = text.parse::<u16>() {
            return port;
        }
    }
    tracing::warn!("Invalid port {:?}, using {}", text, DEFAULT_PORT);
    DEFAULT_PORT
}

/// Parsed `transfer.info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    /// Server address
    pub endpoint: Endpoint,
    /// Display name to register with
    pub client_name: DisplayName,
    /// File to upload, if the record names one
    pub file_path: Option<PathBuf>,
}

impl TransferInfo {
    /// Load the record.
    ///
    /// A missing endpoint line falls back to the default endpoint, a
    /// missing file line leaves `file_path` empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the file cannot be read, or
    /// `ValidationError::MissingField` if there is no client name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let lines = LineFile::new(path.as_ref()).read_lines()?;
        Self::from_lines(&lines)
    }

    /// Parse already-read lines
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if there is no client name.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, Error> {
        let line = |n: usize| {
            lines
                .get(n - 1)
                .map(|l| l.as_ref().trim())
                .filter(|l| !l.is_empty())
        };

        let endpoint = line(ENDPOINT_LINE).map(Endpoint::parse).unwrap_or_else(|| {
            tracing::warn!("No endpoint in {}, using {}", RECORD, Endpoint::default());
            Endpoint::default()
        });

        let client_name = line(NAME_LINE)
            .map(DisplayName::new)
            .ok_or(ValidationError::MissingField {
                field: "client name",
                record: RECORD,
            })?;

        let file_path = line(FILE_LINE).map(PathBuf::from);

        Ok(Self {
            endpoint,
            client_name,
            file_path,
        })
    }

    /// Upload path, required for a transfer
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if the record has no file line.
    pub fn require_file(&self) -> Result<&Path, ValidationError> {
        self.file_path
            .as_deref()
            .ok_or(ValidationError::MissingField {
                field: "file path",
                record: RECORD,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn test_endpoint_valid() {
        let endpoint = Endpoint::parse("192.168.1.10:8080");
        assert_eq!(endpoint.host, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(endpoint.port, 8080);
        assert_eq!(endpoint.to_string(), "192.168.1.10:8080");
    }

    #[test]
    fn test_endpoint_malformed_falls_back() {
        assert_eq!(Endpoint::parse("not-an-ip:99999"), Endpoint::default());
        assert_eq!(Endpoint::parse("garbage"), Endpoint::default());
        assert_eq!(Endpoint::parse(""), Endpoint::default());
        assert_eq!(
            Endpoint::default().socket_addr(),
            "127.0.0.1:1234".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_endpoint_parts_fall_back_independently() {
        let endpoint = Endpoint::parse("example.com:4000");
        assert_eq!(endpoint.host, IpAddr::V4(DEFAULT_HOST));
        assert_eq!(endpoint.port, 4000);

        let endpoint = Endpoint::parse("10.0.0.1:http");
        assert_eq!(endpoint.host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(endpoint.port, DEFAULT_PORT);
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(parse_port("0"), 0);
        assert_eq!(parse_port("65535"), 65535);
        assert_eq!(parse_port("65536"), DEFAULT_PORT);
        assert_eq!(parse_port("-1"), DEFAULT_PORT);
        assert_eq!(parse_port("+80"), DEFAULT_PORT);
        assert_eq!(parse_port(" 80 "), 80);
    }

    #[test]
    fn test_endpoint_ipv6() {
        let endpoint = Endpoint::parse("[::1]:5000");
        assert_eq!(endpoint.host, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, 5000);

        let endpoint = Endpoint::parse("::1");
        assert_eq!(endpoint.host, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, DEFAULT_PORT);
    }

    #[test]
    fn test_from_lines() {
        let info = TransferInfo::from_lines(&["127.0.0.1:1234", "alice", "data/report.txt"]).unwrap();
        assert_eq!(info.endpoint, Endpoint::default());
        assert_eq!(info.client_name.as_str(), "alice");
        assert_eq!(info.require_file().unwrap(), Path::new("data/report.txt"));
    }

    #[test]
    fn test_missing_name() {
        let err = TransferInfo::from_lines(&["127.0.0.1:1234"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField {
                field: "client name",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file_line() {
        let info = TransferInfo::from_lines(&["", "bob"]).unwrap();
        assert_eq!(info.endpoint, Endpoint::default());
        assert!(info.file_path.is_none());
        assert!(info.require_file().is_err());
    }

    #[test]
    fn test_long_name_truncated() {
        let long = "n".repeat(400);
        let info = TransferInfo::from_lines(&["1.2.3.4:5", long.as_str()]).unwrap();
        assert_eq!(info.client_name.as_str().len(), crate::NAME_SIZE);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transfer.info");
        std::fs::write(&path, "10.1.2.3:7000\r\ncarol\r\nfile.bin\r\n").unwrap();

        let info = TransferInfo::load(&path).unwrap();
        assert_eq!(info.endpoint.port, 7000);
        assert_eq!(info.client_name.as_str(), "carol");
        assert_eq!(info.file_path, Some(PathBuf::from("file.bin")));
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = TransferInfo::load(dir.path().join("transfer.info")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Persistence);
    }
}
