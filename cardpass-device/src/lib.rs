//! # cardpass-device
//!
//! Card issuance device protocol client - the wire layer only.
//!
//! ## Scope
//!
//! This crate handles HOW to talk to the card printer/encoder:
//! - Pipe-delimited issuance frame building
//! - MS949 (legacy Korean double-byte) transcoding
//! - One-shot TCP exchange with read-until-close framing
//! - Reply parsing (structured JSON or raw success text)
//!
//! Business logic (WHICH card to issue, persistence) stays in
//! application code: sequencing and the issuance history live in
//! cardpass-server.
//!
//! ## Example
//!
//! ```ignore
//! use cardpass_device::{DeviceConfig, DeviceLink, IssueFrame, NetworkDevice};
//! use cardpass_device::{decode_ms949, DeviceReply};
//!
//! let frame = IssueFrame::new("EMP001", "김철수", "총무부", "과장", 3, "RFID");
//! let device = NetworkDevice::new(DeviceConfig::new("10.0.0.5", 7700))?;
//!
//! let reply = device.exchange(&frame.encode()?).await?;
//! let reply = DeviceReply::parse(&decode_ms949(&reply))?;
//! assert!(reply.is_success());
//! ```

mod encoding;
mod error;
mod frame;
mod reply;
mod transport;

// Re-exports
pub use encoding::{decode_ms949, encode_ms949};
pub use error::{DeviceError, DeviceResult};
pub use frame::{FrameMode, IssueFrame};
pub use reply::{DeviceReply, SUCCESS_CODE};
pub use transport::{DeviceConfig, DeviceLink, NetworkDevice};
