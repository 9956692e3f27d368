//! Error types for YubiKey device operations.
//!
//! A single error enum covers the whole workspace: the TLV codec, the driver
//! layer, discovery, and mode switching all report through [`Error`].

use crate::types::{Mode, Transport};

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the YubiKey device layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A TLV record declared more value bytes than the buffer holds,
    /// or the buffer ended in the middle of a record header.
    #[error("Malformed TLV data: {message}")]
    MalformedTlv { message: String },

    /// A TLV value cannot be encoded because it exceeds the one-byte
    /// length field.
    #[error("TLV value too long: {length} bytes (max 255)")]
    TlvValueTooLong { length: usize },

    /// A mode code outside the device's mode table.
    #[error("Invalid mode code: {code:#04x}")]
    InvalidModeCode { code: u8 },

    /// A transport combination with no corresponding mode code.
    #[error("No mode for transport combination {mask:#04x}")]
    InvalidModeTransports { mask: u32 },

    /// A mode switch was requested to a mode the device does not support.
    #[error("Mode not supported: {mode}")]
    UnsupportedMode { mode: Mode },

    /// A transport switch was requested to a transport the current mode
    /// does not have enabled.
    #[error("{transport} transport not enabled")]
    TransportNotEnabled { transport: Transport },

    /// A transport driver failed while opening a connection.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Discovery aborted because a transport raised while opening.
    #[error("Failed opening device: {source}")]
    FailedOpeningDevice {
        #[source]
        source: Box<Error>,
    },

    /// No device was found on the requested transport.
    #[error("No device found on {transport} transport")]
    DeviceNotFound { transport: Transport },

    /// The device reported a different serial after a transport switch.
    #[error("Device serial changed across transport switch: expected {expected}, got {actual}")]
    SerialMismatch { expected: u32, actual: u32 },

    /// The device reported a different mode after a transport switch.
    #[error("Device mode changed across transport switch: expected {expected}, got {actual}")]
    ModeMismatch { expected: Mode, actual: Mode },

    /// Operation is not supported by this driver.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new malformed-TLV error.
    pub fn malformed_tlv(message: impl Into<String>) -> Self {
        Self::MalformedTlv {
            message: message.into(),
        }
    }

    /// Create a new connection-failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Wrap an error raised while opening a transport during discovery.
    pub fn failed_opening_device(source: Error) -> Self {
        Self::FailedOpeningDevice {
            source: Box::new(source),
        }
    }

    /// Create a new unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}
