//! # M-Bus Error Handling
//!
//! This module defines the `MBusError` enum, which represents the different
//! error types that can occur while talking to an UltraLite PRO meter.

use thiserror::Error;

/// Represents the different error types that can occur in the M-Bus crate.
#[derive(Debug, Error)]
pub enum MBusError {
    /// The configured device path does not exist.
    #[error("device not found: {0}")]
    DeviceAbsent(String),

    /// The process lacks permission to open the device.
    #[error("permission denied opening {0}")]
    PermissionDenied(String),

    /// An I/O error occurred while the device was open; the caller may
    /// reconnect and retry.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The collection window elapsed without yielding any mappable record.
    #[error("no valid data received from meter")]
    NoValidData,

    /// A frame-shaped byte sequence failed checksum or framing validation.
    /// Never surfaced to callers of `read_once`; logged and skipped by the
    /// framer so it can resynchronize on the next byte.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The supplied `MeterConfig` failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MBusError {
    /// Classifies a serial I/O error the way `original_source`'s coordinator
    /// sniffs `serial.SerialException` message text, but against
    /// `std::io::ErrorKind` instead of a string.
    pub fn from_io_error(device_path: &str, err: &std::io::Error) -> MBusError {
        match err.kind() {
            std::io::ErrorKind::NotFound => MBusError::DeviceAbsent(device_path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                MBusError::PermissionDenied(device_path.to_string())
            }
            _ => MBusError::TransportError(err.to_string()),
        }
    }
}
