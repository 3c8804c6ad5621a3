//! Issuance frame builder
//!
//! The card device expects one pipe-delimited text frame per issuance:
//!
//! ```text
//! <mode>|<employeeId>|<name>|<department>|<position>|<cardCount>|<cardType>|<photoPayload>|<issueDateYYYYMMDD>
//! ```
//!
//! Fields are positional; absent optional fields are sent as empty strings.
//! Batch-sequenced frames keep the same field set and append
//! `<sequenceNumber>|<totalInBatch>`.

use crate::encoding::encode_ms949;
use crate::error::DeviceResult;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::NaiveDate;

/// Frame mode field
///
/// `"0"` for an immediate single issuance, `"1"` for a batch-sequenced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    Immediate,
    /// Position within a batch run, 1-based
    Batch { sequence: u32, total: u32 },
}

impl FrameMode {
    fn code(&self) -> &'static str {
        match self {
            FrameMode::Immediate => "0",
            FrameMode::Batch { .. } => "1",
        }
    }
}

/// One outbound issuance frame
///
/// Text fields are sanitized at build time: `|` is the field delimiter and
/// line breaks would split the frame, so both are replaced with spaces.
#[derive(Debug, Clone)]
pub struct IssueFrame {
    mode: FrameMode,
    employee_id: String,
    name: String,
    department: String,
    position: String,
    card_count: i64,
    card_type: String,
    photo: Option<Vec<u8>>,
}

impl IssueFrame {
    pub fn new(
        employee_id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
        position: impl Into<String>,
        card_count: i64,
        card_type: impl Into<String>,
    ) -> Self {
        Self {
            mode: FrameMode::Immediate,
            employee_id: employee_id.into(),
            name: name.into(),
            department: department.into(),
            position: position.into(),
            card_count,
            card_type: card_type.into(),
            photo: None,
        }
    }

    /// Attach the employee photo (raw image bytes, base64-encoded on the wire)
    pub fn with_photo(mut self, photo: Vec<u8>) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Set the frame mode (immediate by default)
    pub fn with_mode(mut self, mode: FrameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the frame text with today's date
    ///
    /// The issue date is stamped at build time, not at commit time.
    pub fn build(&self) -> String {
        self.build_on(chrono::Local::now().date_naive())
    }

    /// Build the frame text with an explicit issue date
    pub fn build_on(&self, issue_date: NaiveDate) -> String {
        let photo_payload = match &self.photo {
            Some(bytes) => STANDARD.encode(bytes),
            None => String::new(),
        };

        let mut frame = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.mode.code(),
            sanitize(&self.employee_id),
            sanitize(&self.name),
            sanitize(&self.department),
            sanitize(&self.position),
            self.card_count,
            sanitize(&self.card_type),
            photo_payload,
            issue_date.format("%Y%m%d"),
        );

        if let FrameMode::Batch { sequence, total } = self.mode {
            frame.push_str(&format!("|{}|{}", sequence, total));
        }

        frame
    }

    /// Build and transcode into the device encoding, ready for the wire
    pub fn encode(&self) -> DeviceResult<Vec<u8>> {
        encode_ms949(&self.build())
    }
}

/// Replace delimiter and line-break characters that would shift fields
fn sanitize(s: &str) -> String {
    if s.contains(['|', '\r', '\n']) {
        s.replace(['|', '\r', '\n'], " ")
    } else {
        s.to_string()
    }
}
