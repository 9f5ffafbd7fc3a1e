//! POSIX `cksum` digest.
//!
//! CRC-32 with polynomial `0x04C11DB7`, no reflection and a zero initial
//! value. After the data, the message length is fed in least-significant
//! byte first using only as many bytes as it needs, and the result is
//! complemented. The server computes the same value over the decrypted
//! upload, so the client always digests the plaintext.

use crc::{CRC_32_CKSUM, Crc, Digest};
use std::fmt;

static CKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_CKSUM);

/// Incremental `cksum` state
#[derive(Clone)]
pub struct Cksum {
    digest: Digest<'static, u32>,
    len: u64,
}

impl Default for Cksum {
    fn default() -> Self {
        Self {
            digest: CKSUM.digest(),
            len: 0,
        }
    }
}

impl fmt::Debug for Cksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cksum").field("len", &self.len).finish()
    }
}

impl Cksum {
    /// Start a new digest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more data
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes digested so far
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if no data has been fed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish the digest
    #[must_use]
    pub fn finalize(mut self) -> u32 {
        let bytes = self.len.to_le_bytes();
        let used = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        self.digest.update(&bytes[..used]);
        self.digest.finalize()
    }
}

/// Digest a complete buffer
#[must_use]
pub fn cksum(data: &[u8]) -> u32 {
    let mut state = Cksum::new();
    state.update(data);
    state.finalize()
}
