//! Configuration surface for an UltraLite PRO readout session.

use crate::error::MBusError;

/// Connection parameters for one meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterConfig {
    /// Path to the serial device the IR probe is attached to, e.g.
    /// `/dev/ttyUSB0`.
    pub device_path: String,
    /// Primary M-Bus address of the meter (0..=255; 0xFE is the usual
    /// "any single meter on the bus" address).
    pub primary_address: u8,
    /// How often the external caller intends to poll, in seconds. `0` means
    /// "caller drives polling manually" and is accepted as a no-op value;
    /// otherwise must fall within a sane range for a 2.5 s-per-transaction
    /// optical readout.
    pub poll_interval_seconds: u32,
}

impl MeterConfig {
    /// Builds a config, validating it immediately.
    pub fn new(
        device_path: impl Into<String>,
        primary_address: u8,
        poll_interval_seconds: u32,
    ) -> Result<Self, MBusError> {
        let config = MeterConfig {
            device_path: device_path.into(),
            primary_address,
            poll_interval_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the config is internally consistent. Does not touch the
    /// filesystem or the serial port: `DeviceAbsent`/`PermissionDenied` are
    /// only raised once `Transport::connect` actually tries to open the
    /// path.
    pub fn validate(&self) -> Result<(), MBusError> {
        if self.device_path.trim().is_empty() {
            return Err(MBusError::InvalidConfig(
                "device_path must not be empty".to_string(),
            ));
        }
        if self.poll_interval_seconds != 0
            && !(10..=3600).contains(&self.poll_interval_seconds)
        {
            return Err(MBusError::InvalidConfig(format!(
                "poll_interval_seconds must be 0 or within 10..=3600, got {}",
                self.poll_interval_seconds
            )));
        }
        Ok(())
    }
}
