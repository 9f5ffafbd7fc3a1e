//! Fuzz target for request decoding
//!
//! Arbitrary bytes must decode to a request or an error, never a panic.

#![no_main]

use cipherpost_core::{FileHeader, Request, RequestHeader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = RequestHeader::decode(data);
    let _ = FileHeader::decode(data);

    // Whatever decodes must encode again
    if let Ok(request) = Request::decode(data) {
        let _ = request.encode();
    }
});
