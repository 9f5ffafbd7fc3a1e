//! Property-based tests for cipherpost
//!
//! Uses proptest to verify codec and session properties across large input
//! spaces.

use proptest::prelude::*;

// ============================================================================
// Wire Codec Properties
// ============================================================================

mod codec_properties {
    use super::*;
    use cipherpost_core::wire::{decode_name, encode_name};
    use cipherpost_core::{ClientId, Request, RequestCode, Response};

    fn request_code() -> impl Strategy<Value = RequestCode> {
        prop_oneof![
            Just(RequestCode::Disconnect),
            Just(RequestCode::Register),
            Just(RequestCode::SendPublicKey),
            Just(RequestCode::SendFile),
            Just(RequestCode::ChecksumOk),
            Just(RequestCode::ChecksumError),
            Just(RequestCode::ChecksumErrorFinal),
        ]
    }

    proptest! {
        /// Request roundtrip: decode(encode(r)) == r
        #[test]
        fn request_roundtrip(
            id in any::<[u8; 16]>(),
            version in any::<u8>(),
            code in request_code(),
            payload in prop::collection::vec(any::<u8>(), 0..512),
            filename in "[a-z0-9._-]{1,255}",
        ) {
            let mut request = Request::new(ClientId::from_bytes(id), code).with_payload(payload);
            request.version = version;
            if code.carries_filename() {
                request.filename = Some(filename);
            }

            let encoded = request.encode().unwrap();
            let decoded = Request::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, request);
        }

        /// Response roundtrip, including codes outside the protocol
        #[test]
        fn response_roundtrip(
            version in any::<u8>(),
            code in any::<u16>(),
            id in any::<[u8; 16]>(),
            payload in prop::collection::vec(any::<u8>(), 0..1024),
        ) {
            let response = Response::new(version, code, ClientId::from_bytes(id), payload);
            let decoded = Response::decode(&response.encode().unwrap()).unwrap();
            prop_assert_eq!(&decoded, &response);
            prop_assert_eq!(decoded.code().is_some(), (2100..=2104).contains(&code));
        }

        /// Truncated requests are rejected, never panic
        #[test]
        fn truncated_request_rejected(
            payload in prop::collection::vec(any::<u8>(), 1..64),
            cut in 0usize..64,
        ) {
            let request = Request::new(ClientId::ZERO, RequestCode::Register).with_payload(payload);
            let encoded = request.encode().unwrap();
            let cut = cut % encoded.len();
            prop_assert!(Request::decode(&encoded[..cut]).is_err());
        }

        /// Filename framing roundtrip for names up to 255 bytes
        #[test]
        fn name_framing_roundtrip(name in "[^\\x00]{0,63}") {
            prop_assume!(name.len() <= 255);
            let field = encode_name(&name);
            prop_assert_eq!(field.len(), 255);
            prop_assert_eq!(decode_name(&field), name);
        }
    }
}

// ============================================================================
// Identity Properties
// ============================================================================

mod identity_properties {
    use super::*;
    use cipherpost_core::identity::{bytes_to_hex, hex_to_bytes, validate_hex};
    use cipherpost_core::{ClientId, DisplayName};

    proptest! {
        /// Hex roundtrip: parse(to_hex(id)) == id
        #[test]
        fn hex_roundtrip(bytes in any::<[u8; 16]>()) {
            let id = ClientId::from_bytes(bytes);
            let hex = id.to_hex();
            prop_assert_eq!(hex.len(), 32);
            prop_assert!(validate_hex(&hex));
            prop_assert_eq!(hex.parse::<ClientId>().unwrap(), id);
            prop_assert_eq!(hex_to_bytes(&bytes_to_hex(&bytes)).unwrap(), bytes);
        }

        /// Anything but exactly 32 hex digits is rejected
        #[test]
        fn wrong_length_hex_rejected(hex in "[0-9a-f]{0,64}") {
            prop_assume!(hex.len() != 32);
            prop_assert!(!validate_hex(&hex));
            prop_assert!(hex.parse::<ClientId>().is_err());
        }

        #[test]
        fn non_hex_rejected(prefix in "[0-9a-f]{31}", bad in "[g-zG-Z!@#]") {
            let text = format!("{prefix}{bad}");
            prop_assert!(!validate_hex(&text));
        }

        /// Display names never exceed 255 bytes and keep a valid prefix
        #[test]
        fn display_name_truncation(name in "\\PC{0,300}") {
            let display = DisplayName::new(name.clone());
            prop_assert!(display.as_str().len() <= 255);
            prop_assert!(name.starts_with(display.as_str()));
            if name.len() <= 255 {
                prop_assert_eq!(display.as_str(), name.as_str());
            }
        }
    }
}

// ============================================================================
// Configuration Properties
// ============================================================================

mod config_properties {
    use super::*;
    use cipherpost_core::Endpoint;
    use cipherpost_core::config::parse_port;
    use std::net::Ipv4Addr;

    proptest! {
        #[test]
        fn endpoint_roundtrip(ip in any::<[u8; 4]>(), port in any::<u16>()) {
            let host = Ipv4Addr::from(ip);
            let endpoint = Endpoint::parse(&format!("{host}:{port}"));
            prop_assert_eq!(endpoint.host, std::net::IpAddr::V4(host));
            prop_assert_eq!(endpoint.port, port);
        }

        /// Parsing arbitrary text never panics
        #[test]
        fn endpoint_parse_total(text in "\\PC{0,64}") {
            let _ = Endpoint::parse(&text);
        }

        #[test]
        fn out_of_range_port_falls_back(port in 65_536u32..10_000_000) {
            prop_assert_eq!(parse_port(&port.to_string()), 1234);
        }
    }
}

// ============================================================================
// Crypto and Checksum Properties
// ============================================================================

mod content_properties {
    use super::*;
    use cipherpost_core::{ClientId, FILE_HEADER_SIZE, FileHeader, NAME_SIZE, TransferItem};
    use cipherpost_crypto::TransferKey;
    use cipherpost_files::{Cksum, SourceFile, cksum};
    use tempfile::TempDir;

    proptest! {
        /// Incremental checksum equals the one-shot checksum
        #[test]
        fn cksum_incremental(data in prop::collection::vec(any::<u8>(), 0..2048), split in any::<usize>()) {
            let split = if data.is_empty() { 0 } else { split % data.len() };
            let mut state = Cksum::new();
            state.update(&data[..split]);
            state.update(&data[split..]);
            prop_assert_eq!(state.finalize(), cksum(&data));
        }

        /// Encoded items carry the header, name and decryptable content
        #[test]
        fn transfer_item_layout(
            key in any::<[u8; 16]>(),
            id in any::<[u8; 16]>(),
            content in prop::collection::vec(any::<u8>(), 0..1024),
        ) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("item.bin");
            std::fs::write(&path, &content).unwrap();
            let source = SourceFile::load(&path).unwrap();
            let key = TransferKey::new(key);

            let item = TransferItem::prepare(ClientId::from_bytes(id), &source, &key);
            let encoded = item.encode().unwrap();

            let header = FileHeader::decode(&encoded).unwrap();
            prop_assert_eq!(header.client_id, ClientId::from_bytes(id));
            prop_assert_eq!(header.content_size as usize % 16, 0);

            let body = &encoded[FILE_HEADER_SIZE + NAME_SIZE..];
            prop_assert_eq!(body.len(), header.content_size as usize);
            let plain = key.decrypt(body).unwrap();
            prop_assert_eq!(cksum(&plain), item.checksum());
            prop_assert_eq!(plain, content);
        }
    }
}

// ============================================================================
// Retry Properties
// ============================================================================

mod retry_properties {
    use super::*;
    use cipherpost_core::wire::RequestHeader;
    use cipherpost_core::{
        ChecksumReport, ClientId, IdentityFile, KeyMaterial, MAX_ATTEMPTS, REQUEST_HEADER_SIZE,
        Response, ResponseCode, Session, SessionState,
    };
    use cipherpost_crypto::TransferKey;
    use cipherpost_transport::ScriptedTransport;
    use tempfile::TempDir;

    const CKSUM_DIGITS: u32 = 930_766_865;

    fn checksum_ready(checksum: u32) -> Vec<u8> {
        let mut bytes =
            Response::new(3, ResponseCode::ChecksumReady.as_u16(), ClientId::ZERO, Vec::new())
                .encode()
                .unwrap();
        bytes.extend_from_slice(
            &ChecksumReport {
                content_size: 9,
                filename: "digits.txt".to_string(),
                checksum,
            }
            .encode(),
        );
        bytes
    }

    fn sent_codes(sent: &[u8]) -> Vec<u16> {
        let mut codes = Vec::new();
        let mut at = 0;
        while at < sent.len() {
            let header = RequestHeader::decode(&sent[at..]).unwrap();
            at += REQUEST_HEADER_SIZE + header.payload_size as usize;
            match header.code {
                1103 => {
                    let file = cipherpost_core::FileHeader::decode(&sent[at..]).unwrap();
                    at += cipherpost_core::FILE_HEADER_SIZE
                        + cipherpost_core::NAME_SIZE
                        + file.content_size as usize;
                }
                1104..=1106 => at += cipherpost_core::NAME_SIZE,
                _ => {}
            }
            codes.push(header.code);
        }
        codes
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// At most four sends, and the attempt counter is back at 1 after
        /// either terminal outcome
        #[test]
        fn retry_is_bounded(mismatches in 0u32..10) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("digits.txt");
            std::fs::write(&path, b"123456789").unwrap();

            let mut script = Vec::new();
            for attempt in 1..=(mismatches + 1).min(MAX_ATTEMPTS) {
                let checksum = if attempt <= mismatches { CKSUM_DIGITS ^ 1 } else { CKSUM_DIGITS };
                script.extend(checksum_ready(checksum));
            }
            script.extend(
                Response::new(3, ResponseCode::MessageReceived.as_u16(), ClientId::ZERO, Vec::new())
                    .encode()
                    .unwrap(),
            );

            let mut session = Session::new(
                ScriptedTransport::with_script(&script),
                IdentityFile::new(dir.path().join("me.info")),
            );
            for state in [
                SessionState::Registering,
                SessionState::Registered,
                SessionState::ExchangingKeys,
                SessionState::KeysReady,
            ] {
                session.transition_to(state).unwrap();
            }

            let keys = KeyMaterial::new(TransferKey::new([1; 16]));
            let outcome = session.transfer(ClientId::ZERO, &keys, &path).unwrap();
            let codes = sent_codes(session.transport().sent());
            let sends = codes.iter().filter(|&&c| c == 1103).count() as u32;

            prop_assert!(sends <= MAX_ATTEMPTS);
            prop_assert_eq!(sends, (mismatches + 1).min(MAX_ATTEMPTS));
            prop_assert_eq!(session.counters().attempt, 1);
            if mismatches < MAX_ATTEMPTS {
                prop_assert_eq!(outcome.state, SessionState::Done);
            } else {
                prop_assert_eq!(outcome.state, SessionState::FinalFail);
                prop_assert_eq!(codes.last(), Some(&1106));
            }
        }
    }
}
