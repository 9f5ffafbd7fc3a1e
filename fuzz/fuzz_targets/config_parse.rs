//! Fuzz target for transfer record parsing
//!
//! Arbitrary text parsed as `transfer.info` lines must never panic.

#![no_main]

use cipherpost_core::{Endpoint, TransferInfo};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = Endpoint::parse(s);

        let lines: Vec<&str> = s.lines().collect();
        if let Ok(info) = TransferInfo::from_lines(&lines) {
            let _ = info.endpoint.socket_addr();
            let _ = info.require_file();
        }
    }
});
