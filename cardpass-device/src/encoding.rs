//! MS949 encoding utilities for the card issuance device
//!
//! The device firmware speaks the legacy Korean double-byte encoding
//! (historically MS949 / windows-949; `encoding_rs` exposes it as EUC-KR).
//! Employee names, departments and positions routinely contain non-ASCII
//! characters, so frames must be transcoded before transmission and replies
//! transcoded back on receipt.

use crate::error::{DeviceError, DeviceResult};

/// Encode native text into MS949 bytes for the wire.
///
/// Fails if the text contains characters the device encoding cannot
/// represent; sending replacement bytes would print a corrupted card.
pub fn encode_ms949(s: &str) -> DeviceResult<Vec<u8>> {
    let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode(s);
    if had_errors {
        return Err(DeviceError::Encoding(format!(
            "Text not representable in MS949: {}",
            s
        )));
    }
    Ok(bytes.into_owned())
}

/// Decode MS949 bytes received from the device into native text.
///
/// Inbound bytes are outside our control, so undecodable sequences are
/// replaced rather than rejected; reply parsing decides what to do with
/// the result.
pub fn decode_ms949(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::EUC_KR.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trip() {
        let bytes = encode_ms949("RFID|0001|100").unwrap();
        assert_eq!(bytes, b"RFID|0001|100");
        assert_eq!(decode_ms949(&bytes), "RFID|0001|100");
    }

    #[test]
    fn test_hangul_round_trip() {
        let original = "총무부 과장 김철수";
        let bytes = encode_ms949(original).unwrap();
        // Double-byte on the wire, not UTF-8
        assert_ne!(bytes, original.as_bytes());
        assert_eq!(decode_ms949(&bytes), original);
    }

    #[test]
    fn test_unmappable_text_is_rejected() {
        // Emoji have no MS949 representation
        let result = encode_ms949("보안팀 🔑");
        assert!(matches!(result, Err(DeviceError::Encoding(_))));
    }
}
