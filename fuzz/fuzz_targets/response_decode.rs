//! Fuzz target for response decoding
//!
//! Covers both the slice decoder and the stream reader, including the
//! checksum report that may trail a response.

#![no_main]

use cipherpost_core::{ChecksumReport, Response};
use cipherpost_transport::ScriptedTransport;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Response::decode(data);
    let _ = ChecksumReport::decode(data);

    let mut transport = ScriptedTransport::with_script(data);
    while let Ok(response) = Response::read_from(&mut transport) {
        let _ = response.code();
        if ChecksumReport::for_response(&response, &mut transport).is_err() {
            break;
        }
    }
});
