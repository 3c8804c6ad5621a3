//! Error types for the card device library

use thiserror::Error;

/// Card device error types
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Socket-level failure at any point in the exchange (refused, reset,
    /// unreachable), wrapping the cause
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The whole exchange did not finish within the configured window
    #[error("Device timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The device closed the connection without sending any bytes
    #[error("Device closed the connection without a response")]
    NoResponse,

    /// Invalid device configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Outbound text could not be represented in the device encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The device reply matched neither the structured nor the raw shape
    #[error("Unrecognized device reply: {0}")]
    Decode(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;
