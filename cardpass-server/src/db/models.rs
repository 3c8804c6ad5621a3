//! Card issuance data model

use serde::{Deserialize, Serialize};

/// Physical card type requested for an issuance
///
/// RFID cards carry a device-assigned serial (CSN) and a meaningful
/// per-employee issuance count. PVC cards are print-only: no serial, and
/// the count is recorded as the placeholder 0. The legacy variants behave
/// like RFID for sequencing and serial purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CardType {
    Rfid,
    Pvc,
    Employee,
    Visitor,
    Temporary,
    Contractor,
}

impl CardType {
    /// Field value sent in the issuance frame
    pub fn wire_code(&self) -> &'static str {
        match self {
            CardType::Rfid => "RFID",
            CardType::Pvc => "PVC",
            CardType::Employee => "EMPLOYEE",
            CardType::Visitor => "VISITOR",
            CardType::Temporary => "TEMPORARY",
            CardType::Contractor => "CONTRACTOR",
        }
    }

    /// PVC issuances always record the placeholder count 0
    pub fn uses_placeholder_count(&self) -> bool {
        matches!(self, CardType::Pvc)
    }

    /// Whether the device assigns a meaningful serial for this type
    pub fn tracks_serial(&self) -> bool {
        !matches!(self, CardType::Pvc)
    }
}

/// Immutable employee snapshot read at issuance time
///
/// Rows are synced in by the external HR jobs; this service never writes
/// the employee table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeCardProfile {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

/// One append-only history row per issuance that reached terminal success
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardIssueRecord {
    pub employee_id: String,
    pub department: String,
    pub position: String,
    pub card_count: i64,
    pub card_serial: String,
    pub card_type: CardType,
    pub issuer_id: String,
    /// Unix millis
    pub issued_at: i64,
}

/// The card an employee currently holds, upserted on every issuance
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CurrentCardState {
    pub employee_id: String,
    pub card_count: i64,
    pub status: String,
    pub card_serial: String,
    pub card_type: CardType,
    /// Unix millis
    pub updated_at: i64,
}

/// Card status values used in `current_card.status`
pub const CARD_STATUS_ACTIVE: &str = "active";

/// One queued batch issuance request for an employee
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BatchWorklistEntry {
    pub employee_id: String,
    pub issuer_id: String,
    pub requested_type: CardType,
    /// Unix millis
    pub queued_at: i64,
}
