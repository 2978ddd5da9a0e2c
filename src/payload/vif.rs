//! Value Information Field mapping for the UltraLite PRO vendor profile.
//!
//! Table-driven, per the same shape as a generic EN 13757-3 VIF table, but
//! scoped to exactly the VIFs this meter emits, with an exact-match table
//! consulted before a range-match table so a few specific codes (`0x14`,
//! `0x27`) are never shadowed by the broader ranges they sit inside.

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::constants::MBUS_DIB_VIF_WITHOUT_EXTENSION;
use crate::payload::record::RecordValue;

/// How a raw decoded `RecordValue` becomes a named physical quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    /// Pass the numeric value through unchanged.
    Identity,
    /// Divide by `10^n`.
    DivideByPow10(u32),
    /// Interpret the value as whole units, truncated to an integer.
    AsInteger,
    /// Volume/flow family: `value * 10^(vif & 0x07 - 6)`, where the VIF's
    /// low 3 bits select the scale within the 0x38..0x3F row group.
    VolumeFlowScaled,
    /// Generic power-of-ten scaling keyed by the low bits of the VIF
    /// itself: `value * 10^((vif & mask) as i32 - shift)`. Covers the
    /// energy-in-joules, scaled-volume and temperature row groups, each
    /// of which derives its exponent from a different low-bit mask/shift
    /// pair rather than a fixed divisor.
    Scaled10 { mask: u8, shift: i32 },
    /// Interpret the value as Unix seconds and format as UTC ISO-8601.
    EpochSeconds,
    /// Render as a zero-padded 8-digit string (serial numbers).
    ZeroPadded8,
}

/// A fully mapped quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedQuantity {
    pub name: String,
    pub value: QuantityValue,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuantityValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Null,
}

struct VifEntry {
    vif: u8,
    name: &'static str,
    transform: TransformKind,
    unit: Option<&'static str>,
}

/// Exact-match rows, consulted before the range table. `0x14` and `0x27`
/// live here specifically so they win over the generic `0x20..0x27` volume
/// range and `0x10..0x17` energy-in-joules range they would otherwise fall
/// within.
const EXACT_VIF_TABLE: &[VifEntry] = &[
    VifEntry {
        vif: 0x06,
        name: "energy_total",
        transform: TransformKind::Identity,
        unit: Some("kWh"),
    },
    VifEntry {
        vif: 0x14,
        name: "volume_total",
        transform: TransformKind::DivideByPow10(2),
        unit: Some("m³"),
    },
    VifEntry {
        vif: 0x27,
        name: "operating_time_days",
        transform: TransformKind::AsInteger,
        unit: Some("days"),
    },
    VifEntry {
        vif: 0x6D,
        name: "time_point",
        transform: TransformKind::EpochSeconds,
        unit: None,
    },
    VifEntry {
        vif: 0x78,
        name: "serial_number",
        transform: TransformKind::ZeroPadded8,
        unit: None,
    },
];

struct VifRangeEntry {
    range: std::ops::RangeInclusive<u8>,
    name: &'static str,
    transform: TransformKind,
    unit: Option<&'static str>,
}

/// Generic row groups, consulted only after `EXACT_VIF_TABLE` misses —
/// `0x14` and `0x27` sit inside the `0x10..=0x17` and `0x20..=0x27` ranges
/// below but are resolved by their exact-match rows first (see the Open
/// Question note at the top of this module).
const RANGE_VIF_TABLE: &[VifRangeEntry] = &[
    VifRangeEntry {
        range: 0x10..=0x17,
        name: "energy_total_J",
        transform: TransformKind::Scaled10 { mask: 0x07, shift: 0 },
        unit: Some("J"),
    },
    VifRangeEntry {
        range: 0x20..=0x27,
        name: "volume_total",
        transform: TransformKind::Scaled10 { mask: 0x07, shift: 6 },
        unit: Some("m³"),
    },
    VifRangeEntry {
        range: 0x38..=0x3F,
        name: "volume_flow",
        transform: TransformKind::VolumeFlowScaled,
        unit: Some("m³/h"),
    },
    VifRangeEntry {
        range: 0x58..=0x5B,
        name: "flow_temperature",
        transform: TransformKind::Scaled10 { mask: 0x03, shift: 3 },
        unit: Some("°C"),
    },
    VifRangeEntry {
        range: 0x5C..=0x5F,
        name: "return_temperature",
        transform: TransformKind::Scaled10 { mask: 0x03, shift: 3 },
        unit: Some("°C"),
    },
    VifRangeEntry {
        range: 0x60..=0x63,
        name: "delta_temperature",
        transform: TransformKind::Scaled10 { mask: 0x03, shift: 3 },
        unit: Some("K"),
    },
];

fn lookup_exact(vif: u8) -> Option<&'static VifEntry> {
    EXACT_VIF_TABLE.iter().find(|e| e.vif == vif)
}

fn lookup_range(vif: u8) -> Option<(&'static str, TransformKind, Option<&'static str>)> {
    RANGE_VIF_TABLE
        .iter()
        .find(|e| e.range.contains(&vif))
        .map(|e| (e.name, e.transform, e.unit))
}

/// Extension-VIF (`0xFD`) table, keyed by the first VIFE byte with its
/// extension bit masked off.
const EXTENSION_VIF_TABLE: &[(u8, &str, TransformKind)] = &[
    (0x0E, "firmware_version", TransformKind::AsInteger),
    (0x0F, "software_version", TransformKind::AsInteger),
    (0x08, "access_number", TransformKind::AsInteger),
    (0x09, "medium_code", TransformKind::AsInteger),
];

fn lookup_extension(first_vife: u8) -> Option<(&'static str, TransformKind)> {
    let masked = first_vife & MBUS_DIB_VIF_WITHOUT_EXTENSION;
    EXTENSION_VIF_TABLE
        .iter()
        .find(|(vife, _, _)| *vife == masked)
        .map(|(_, name, transform)| (*name, *transform))
}

fn record_value_as_f64(value: &RecordValue) -> Option<f64> {
    match value {
        RecordValue::UInt(v) => Some(*v as f64),
        RecordValue::Float(v) => Some(*v as f64),
        RecordValue::Decimal(v) => Some(*v as f64),
        RecordValue::Bytes(_) | RecordValue::Empty => None,
    }
}

fn apply_transform(transform: TransformKind, value: &RecordValue, vif: u8) -> QuantityValue {
    match transform {
        TransformKind::Identity => match record_value_as_f64(value) {
            Some(v) => QuantityValue::Number(v),
            None => QuantityValue::Null,
        },
        TransformKind::DivideByPow10(n) => match record_value_as_f64(value) {
            Some(v) => QuantityValue::Number(v / 10f64.powi(n as i32)),
            None => QuantityValue::Null,
        },
        TransformKind::AsInteger => match record_value_as_f64(value) {
            Some(v) => QuantityValue::Integer(v as i64),
            None => QuantityValue::Null,
        },
        TransformKind::VolumeFlowScaled => match record_value_as_f64(value) {
            Some(v) => {
                let n = (vif & 0x07) as i32;
                QuantityValue::Number(v * 10f64.powi(n - 6))
            }
            None => QuantityValue::Null,
        },
        TransformKind::Scaled10 { mask, shift } => match record_value_as_f64(value) {
            Some(v) => {
                let n = (vif & mask) as i32 - shift;
                QuantityValue::Number(v * 10f64.powi(n))
            }
            None => QuantityValue::Null,
        },
        TransformKind::EpochSeconds => match record_value_as_f64(value) {
            Some(v) => match Utc.timestamp_opt(v as i64, 0).single() {
                Some(dt) => QuantityValue::Text(dt.to_rfc3339()),
                None => QuantityValue::Null,
            },
            None => QuantityValue::Null,
        },
        TransformKind::ZeroPadded8 => match value {
            RecordValue::Decimal(v) => QuantityValue::Text(format!("{v:08}")),
            RecordValue::UInt(v) => QuantityValue::Text(format!("{v:08}")),
            _ => QuantityValue::Null,
        },
    }
}

/// Maps a primary VIF (with no extension bit set) plus its decoded value to
/// a named quantity, or `None` if this VIF is not part of the UltraLite PRO
/// profile or the record carries no value (per spec.md §4.4: a record with
/// no value always maps to nothing, regardless of its VIF).
pub fn decode(vif: u8, value: &RecordValue) -> Option<DecodedQuantity> {
    if matches!(value, RecordValue::Empty) {
        return None;
    }
    if let Some(entry) = lookup_exact(vif) {
        return Some(DecodedQuantity {
            name: entry.name.to_string(),
            value: apply_transform(entry.transform, value, vif),
            unit: entry.unit.map(str::to_string),
        });
    }
    if let Some((name, transform, unit)) = lookup_range(vif) {
        return Some(DecodedQuantity {
            name: name.to_string(),
            value: apply_transform(transform, value, vif),
            unit: unit.map(str::to_string),
        });
    }
    None
}

/// Maps an extension-VIF (`0xFD`) record, keyed by its first VIFE byte.
pub fn decode_extension(first_vife: u8, value: &RecordValue) -> Option<DecodedQuantity> {
    if matches!(value, RecordValue::Empty) {
        return None;
    }
    let (name, transform) = lookup_extension(first_vife)?;
    Some(DecodedQuantity {
        name: name.to_string(),
        value: apply_transform(transform, value, 0),
        unit: None,
    })
}
