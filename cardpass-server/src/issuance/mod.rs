//! Card Issuance Module
//!
//! The orchestrator (`service`) runs one atomic issuance attempt end to
//! end; the batch driver (`batch`) replays it over an issuer's pending
//! worklist.

pub mod batch;
pub mod service;
pub mod types;

pub use service::IssuanceService;
pub use types::{BatchItemResult, CardIssueRequest, CardIssueResult};
