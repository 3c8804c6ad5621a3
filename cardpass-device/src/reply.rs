//! Device reply parsing
//!
//! Depending on firmware, the device answers either with a JSON object
//! (`{"result":"100","cardCSN":"..."}`) or with a raw delimited string that
//! contains `"100"` or `"OK"` on success. The structured shape is tried
//! first, then the raw fallback; anything else is a decode failure.

use crate::error::{DeviceError, DeviceResult};
use serde::Deserialize;

/// Result code the device reports on success
pub const SUCCESS_CODE: &str = "100";

#[derive(Debug, Deserialize)]
struct StructuredReply {
    result: String,
    #[serde(rename = "cardCSN")]
    card_csn: Option<String>,
}

/// Parsed device reply, tagged by wire shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReply {
    /// JSON object with a result code and, for RFID, the card serial
    Structured { code: String, csn: Option<String> },
    /// Raw text the device reported success with (contains "100" or "OK")
    Raw { text: String },
}

impl DeviceReply {
    /// Parse a transcoded reply string
    pub fn parse(text: &str) -> DeviceResult<Self> {
        let trimmed = text.trim();

        if let Ok(reply) = serde_json::from_str::<StructuredReply>(trimmed) {
            return Ok(DeviceReply::Structured {
                code: reply.result,
                csn: reply.card_csn.filter(|c| !c.is_empty()),
            });
        }

        // Raw firmware has no failure vocabulary we can rely on; only a
        // reply carrying the success markers is accepted.
        if trimmed.contains(SUCCESS_CODE) || trimmed.contains("OK") {
            return Ok(DeviceReply::Raw {
                text: trimmed.to_string(),
            });
        }

        Err(DeviceError::Decode(trimmed.to_string()))
    }

    /// Result code as reported by the device
    pub fn result_code(&self) -> &str {
        match self {
            DeviceReply::Structured { code, .. } => code,
            DeviceReply::Raw { .. } => SUCCESS_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code() == SUCCESS_CODE
    }

    /// Device-assigned card serial, when the reply carries one
    pub fn csn(&self) -> Option<&str> {
        match self {
            DeviceReply::Structured { csn, .. } => csn.as_deref(),
            DeviceReply::Raw { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_success_with_csn() {
        let reply = DeviceReply::parse(r#"{"result":"100","cardCSN":"ABC123"}"#).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.result_code(), "100");
        assert_eq!(reply.csn(), Some("ABC123"));
    }

    #[test]
    fn test_structured_success_without_csn() {
        let reply = DeviceReply::parse(r#"{"result":"100"}"#).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.csn(), None);
    }

    #[test]
    fn test_structured_failure_code() {
        let reply = DeviceReply::parse(r#"{"result":"200"}"#).unwrap();
        assert!(!reply.is_success());
        assert_eq!(reply.result_code(), "200");
    }

    #[test]
    fn test_empty_csn_is_treated_as_absent() {
        let reply = DeviceReply::parse(r#"{"result":"100","cardCSN":""}"#).unwrap();
        assert_eq!(reply.csn(), None);
    }

    #[test]
    fn test_raw_success_markers() {
        for text in ["ISSUE|100|DONE", "OK", "PRINT OK\r\n"] {
            let reply = DeviceReply::parse(text).unwrap();
            assert!(reply.is_success(), "expected success for {:?}", text);
            assert_eq!(reply.csn(), None);
        }
    }

    #[test]
    fn test_unrecognized_reply_is_decode_failure() {
        let result = DeviceReply::parse("ERR|42|JAM");
        assert!(matches!(result, Err(DeviceError::Decode(_))));
    }
}
