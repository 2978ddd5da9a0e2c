//! Transport driver: owns one serial handle and runs the UltraLite PRO
//! wakeup/request/collect transaction.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::BytesMut;
use serde::Serialize;
use tokio::time::sleep;

use crate::constants::{MBUS_CONTROL_REQ_UD2, MBUS_CONTROL_SND_NKE};
use crate::error::MBusError;
use crate::logging::{log_debug, log_warn};
use crate::mbus::frame::{next_frame, pack_short, Frame};
use crate::mbus::port::{Parity, SerialPort, TokioSerialPort};
use crate::payload::record::{is_extension_vif, parse_fixed_header, parse_records, FixedHeader};
use crate::payload::vif::{self, DecodedQuantity, QuantityValue};

const WAKEUP_DURATION: Duration = Duration::from_millis(2200);
const WAKEUP_CHUNK: [u8; 32] = [0x55; 32];
/// Transmission time for one `WAKEUP_CHUNK` at 2400 baud, 8N1 (10 bit
/// periods per byte): paces the burst so it does not spin faster than the
/// wire could actually carry it when writes to the underlying port don't
/// themselves block for that long.
const WAKEUP_CHUNK_TX_TIME: Duration =
    Duration::from_micros(WAKEUP_CHUNK.len() as u64 * 10 * 1_000_000 / 2400);
const POST_WAKEUP_SETTLE: Duration = Duration::from_millis(50);
const PRE_COMMAND_SETTLE: Duration = Duration::from_millis(350);
const INTER_COMMAND_DELAY: Duration = Duration::from_millis(350);
const COLLECT_WINDOW: Duration = Duration::from_millis(2500);
const READ_CHUNK_TIMEOUT: Duration = Duration::from_millis(150);
const READ_CHUNK_SIZE: usize = 512;

const MAX_ATTEMPTS: u32 = 3;

/// Descriptive fields plus mapped quantities yielded by one successful
/// transaction.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DecodedReadout {
    pub device_id: Option<u32>,
    pub manufacturer: Option<String>,
    pub version: Option<u8>,
    pub medium: Option<u8>,
    pub access_no: Option<u8>,
    pub status: Option<u8>,
    pub values: BTreeMap<String, DecodedQuantity>,
}

/// Owns a serial handle for one meter and runs transactions against it.
pub struct Transport<P: SerialPort> {
    port: P,
    primary_address: u8,
}

impl Transport<TokioSerialPort> {
    /// Opens the configured device.
    pub async fn connect(device_path: &str, primary_address: u8) -> Result<Self, MBusError> {
        let port = TokioSerialPort::open(device_path).await?;
        Ok(Transport {
            port,
            primary_address,
        })
    }
}

impl<P: SerialPort> Transport<P> {
    /// Builds a transport around an already-open port (used by tests with
    /// an in-memory `SerialPort`).
    pub fn with_port(port: P, primary_address: u8) -> Self {
        Transport {
            port,
            primary_address,
        }
    }

    async fn send_wakeup(&mut self) -> Result<(), MBusError> {
        self.port
            .set_parity(Parity::None)
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        self.port
            .reset_input()
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        self.port
            .reset_output()
            .map_err(|e| MBusError::TransportError(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + WAKEUP_DURATION;
        while tokio::time::Instant::now() < deadline {
            self.port
                .write_all(&WAKEUP_CHUNK)
                .await
                .map_err(|e| MBusError::TransportError(e.to_string()))?;
            sleep(WAKEUP_CHUNK_TX_TIME).await;
        }
        self.port
            .flush()
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        sleep(POST_WAKEUP_SETTLE).await;
        Ok(())
    }

    async fn send_request_commands(&mut self) -> Result<(), MBusError> {
        self.port
            .set_parity(Parity::Even)
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        self.port
            .reset_input()
            .map_err(|e| MBusError::TransportError(e.to_string()))?;

        let snd_nke = pack_short(MBUS_CONTROL_SND_NKE, self.primary_address);
        self.port
            .write_all(&snd_nke)
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        self.port
            .flush()
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        sleep(INTER_COMMAND_DELAY).await;

        let req_ud2 = pack_short(MBUS_CONTROL_REQ_UD2, self.primary_address);
        self.port
            .write_all(&req_ud2)
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        self.port
            .flush()
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))?;
        Ok(())
    }

    async fn collect(&mut self) -> Result<BytesMut, MBusError> {
        let deadline = tokio::time::Instant::now() + COLLECT_WINDOW;
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
        while tokio::time::Instant::now() < deadline {
            let chunk = self
                .port
                .read_upto(READ_CHUNK_SIZE, READ_CHUNK_TIMEOUT)
                .await
                .map_err(|e| MBusError::TransportError(e.to_string()))?;
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Runs one full transaction: wakeup, request, collect, parse, map,
    /// derive. Does not retry; see `read_with_retry` for the retry policy.
    pub async fn read_once(&mut self) -> Result<DecodedReadout, MBusError> {
        self.send_wakeup().await?;
        sleep(PRE_COMMAND_SETTLE).await;
        self.send_request_commands().await?;

        let buf = self.collect().await?;
        let readout = parse_readout(&buf);

        if readout.device_id.is_none() && readout.values.is_empty() {
            return Err(MBusError::NoValidData);
        }
        Ok(readout)
    }

    /// Reopens the underlying handle at the same path/settings, per the
    /// "disconnect and reopen" step of the retry policy.
    pub async fn reconnect(&mut self) -> Result<(), MBusError> {
        self.port
            .reconnect()
            .await
            .map_err(|e| MBusError::TransportError(e.to_string()))
    }

    /// Runs `read_once` up to three times with exponential backoff between
    /// attempts. A transport error also triggers a `reconnect` before the
    /// next attempt; `NoValidData` retries in place.
    pub async fn read_with_retry(&mut self) -> Result<DecodedReadout, MBusError> {
        let mut last_err = MBusError::NoValidData;
        for attempt in 0..MAX_ATTEMPTS {
            match self.read_once().await {
                Ok(readout) => return Ok(readout),
                Err(MBusError::TransportError(msg)) => {
                    log_warn(&format!(
                        "transport error on attempt {}/{}: {msg}, reconnecting",
                        attempt + 1,
                        MAX_ATTEMPTS
                    ));
                    last_err = MBusError::TransportError(msg);
                    let _ = self.reconnect().await;
                }
                Err(MBusError::NoValidData) => {
                    log_warn(&format!(
                        "no valid data on attempt {}/{}",
                        attempt + 1,
                        MAX_ATTEMPTS
                    ));
                    last_err = MBusError::NoValidData;
                }
                Err(terminal) => return Err(terminal),
            }
            if attempt + 1 < MAX_ATTEMPTS {
                sleep(Duration::from_secs(1 << attempt)).await;
            }
        }
        Err(last_err)
    }
}

/// Scans `buf` for every frame, decodes their payloads and merges the
/// results into one readout. Later frames overwrite earlier values for the
/// same key, matching the original reader's plain dict assignment.
fn parse_readout(buf: &[u8]) -> DecodedReadout {
    let mut readout = DecodedReadout::default();
    let mut work = buf;

    loop {
        let (frame, rest) = next_frame(work);
        work = rest;
        let frame = match frame {
            Some(f) => f,
            None => break,
        };

        let payload = match frame {
            Frame::Long { payload, .. } => payload,
            _ => continue,
        };

        let (header, record_bytes): (Option<FixedHeader>, &[u8]) =
            match parse_fixed_header(&payload) {
                Some((header, rest)) => (Some(header), rest),
                None => (None, payload.as_slice()),
            };

        if let Some(header) = header {
            readout.device_id = Some(header.id);
            readout.manufacturer = Some(header.manufacturer);
            readout.version = Some(header.version);
            readout.medium = Some(header.medium);
            readout.access_no = Some(header.access_no);
            readout.status = Some(header.status);
        }

        for record in parse_records(record_bytes) {
            if record.special {
                continue;
            }
            let mapped = if is_extension_vif(record.vif) {
                record
                    .vifes
                    .first()
                    .and_then(|first_vife| vif::decode_extension(*first_vife, &record.value))
            } else {
                vif::decode(record.vif, &record.value)
            };
            if let Some(quantity) = mapped {
                readout.values.insert(quantity.name.clone(), quantity);
            } else {
                log_debug(&format!(
                    "unmapped VIF 0x{:02X} for UltraLite PRO profile, dropping record",
                    record.vif
                ));
            }
        }
    }

    derive_thermal_power(&mut readout);
    readout
}

/// Adds `thermal_power` (kW) when both `volume_flow` (m³/h) and
/// `delta_temperature` (K) are present and numeric: `1.163 * flow * ΔT`.
fn derive_thermal_power(readout: &mut DecodedReadout) {
    let flow = readout.values.get("volume_flow").and_then(as_number);
    let delta_t = readout.values.get("delta_temperature").and_then(as_number);
    if let (Some(flow), Some(delta_t)) = (flow, delta_t) {
        let power_kw = 1.163 * flow * delta_t;
        readout.values.insert(
            "thermal_power".to_string(),
            DecodedQuantity {
                name: "thermal_power".to_string(),
                value: QuantityValue::Number(power_kw),
                unit: Some("kW".to_string()),
            },
        );
    }
}

fn as_number(q: &DecodedQuantity) -> Option<f64> {
    match q.value {
        QuantityValue::Number(v) => Some(v),
        QuantityValue::Integer(v) => Some(v as f64),
        _ => None,
    }
}
