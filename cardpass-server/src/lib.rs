//! Cardpass Server - employee ID card issuance backend
//!
//! This crate is the application side of the card issuance protocol
//! client. The wire layer (framing, MS949 transcoding, TCP exchange)
//! lives in `cardpass-device`; this crate adds everything around it:
//!
//! - **Issuance orchestrator** (`issuance`): profile load, sequence
//!   computation, device exchange, atomic persistence
//! - **Batch driver** (`issuance::batch`): sequential replay over an
//!   operator's pending worklist
//! - **Database** (`db`): SQLite issuance tables behind sqlx
//! - **Configuration** (`config`): device and datastore parameters
//!
//! The HTTP layer, authentication and the HR data sync are external
//! collaborators; they call [`IssuanceService::issue_card`] and
//! [`IssuanceService::issue_batch`] with validated parameters.
//!
//! # Module structure
//!
//! ```text
//! cardpass-server/src/
//! ├── config.rs      # environment-backed configuration
//! ├── error.rs       # issuance error taxonomy
//! ├── db/            # pool, models, repositories, migrations
//! └── issuance/      # orchestrator, batch driver, request types
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod issuance;
pub mod util;

// Re-export public types
pub use config::Config;
pub use error::{IssueError, IssueFailure, IssueResult};
pub use issuance::{BatchItemResult, CardIssueRequest, CardIssueResult, IssuanceService};
