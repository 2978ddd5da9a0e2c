//! # ultralite-mbus — M-Bus readout for Itron Integral-V UltraLite PRO meters
//!
//! Talks M-Bus (EN 13757-3) over an IR optical probe on a serial port to
//! read out energy, volume, flow and temperature quantities from an
//! UltraLite PRO heat/energy meter.
//!
//! ## Usage
//!
//! ```no_run
//! use ultralite_mbus::{MeterConfig, Transport};
//!
//! # async fn run() -> Result<(), ultralite_mbus::MBusError> {
//! let config = MeterConfig::new("/dev/ttyUSB0", 0xFE, 60)?;
//! let mut transport = Transport::connect(&config.device_path, config.primary_address).await?;
//! let readout = transport.read_with_retry().await?;
//! for (name, quantity) in &readout.values {
//!     println!("{name}: {:?} {:?}", quantity.value, quantity.unit);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod mbus;
pub mod payload;

pub use crate::config::MeterConfig;
pub use crate::error::MBusError;
pub use crate::logging::{init_logger, log_debug, log_error, log_info, log_warn};
pub use crate::mbus::{DecodedReadout, Frame, Parity, SerialPort, TokioSerialPort, Transport};
pub use crate::payload::{
    decode, decode_extension, DecodedQuantity, FixedHeader, QuantityValue, RawRecord,
    RecordValue, TransformKind,
};
