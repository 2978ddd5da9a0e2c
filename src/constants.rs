//! M-Bus Protocol Constants
//!
//! Constants used by the framer, record parser and transport driver, based
//! on the EN 13757-3 standard and the exact control bytes the UltraLite PRO
//! meter expects.

/// DIF (Data Information Field) mask for data length / type.
pub const MBUS_DATA_RECORD_DIF_MASK_DATA: u8 = 0x0F;

/// DIF extension bit (continuation into a DIFE byte).
pub const MBUS_DIB_DIF_EXTENSION_BIT: u8 = 0x80;

/// DIF idle filler.
pub const MBUS_DIB_DIF_IDLE_FILLER: u8 = 0x2F;

/// DIF manufacturer-specific data, opaque to this crate.
pub const MBUS_DIB_DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;

/// DIF "more records follow" marker.
pub const MBUS_DIB_DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;

/// VIF extension bit (continuation into a VIFE byte).
pub const MBUS_DIB_VIF_EXTENSION_BIT: u8 = 0x80;

/// VIF value with the extension bit masked off.
pub const MBUS_DIB_VIF_WITHOUT_EXTENSION: u8 = 0x7F;

/// Control byte for SND_NKE (link reset), sent during wakeup.
pub const MBUS_CONTROL_SND_NKE: u8 = 0x40;

/// Control byte for REQ_UD2 (request user data class 2), sent to request a
/// telegram. The UltraLite PRO only ever sees one request per transaction,
/// so the FCB bit is fixed at 1 rather than toggled across calls.
pub const MBUS_CONTROL_REQ_UD2: u8 = 0x7B;

/// CI code for a variable-length data response.
pub const MBUS_CI_RESP_VARIABLE: u8 = 0x72;

/// CI code for a fixed-length data response. UltraLite PRO readout is
/// variable-format only; this constant exists for completeness of the CI
/// space but is not dispatched to a parser.
pub const MBUS_CI_RESP_FIXED: u8 = 0x73;

/// Single-byte ACK frame.
pub const MBUS_FRAME_ACK: u8 = 0xE5;

/// Start byte shared by both short and long frames' header (short: 0x10,
/// long: 0x68). Declared separately below since they differ.
pub const MBUS_FRAME_SHORT_START: u8 = 0x10;
pub const MBUS_FRAME_LONG_START: u8 = 0x68;
pub const MBUS_FRAME_STOP: u8 = 0x16;
