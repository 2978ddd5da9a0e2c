//! Fixed-header and variable-record parsing for a long-frame payload.
//!
//! Total functions: a truncated or malformed payload simply stops yielding
//! records rather than erroring, mirroring the original reader's behavior
//! of silently breaking out of its record loop on a short read.

use nom::{bytes::complete::take, number::complete::be_u8, IResult};

use crate::codec::{decode_bcd_le, decode_f32_le, decode_uint_le, manufacturer_from_word};
use crate::constants::{
    MBUS_DATA_RECORD_DIF_MASK_DATA, MBUS_DIB_DIF_EXTENSION_BIT, MBUS_DIB_DIF_IDLE_FILLER,
    MBUS_DIB_DIF_MANUFACTURER_SPECIFIC, MBUS_DIB_DIF_MORE_RECORDS_FOLLOW,
    MBUS_DIB_VIF_EXTENSION_BIT,
};

/// Fixed twelve-byte header found at the start of every long-frame
/// payload: device id, manufacturer, version/medium/access/status and a
/// signature word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHeader {
    pub id: u32,
    pub manufacturer: String,
    pub version: u8,
    pub medium: u8,
    pub access_no: u8,
    pub status: u8,
    pub signature: u16,
}

/// The decoded value of a record, before VIF mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    UInt(u64),
    Float(f32),
    Decimal(u64),
    Bytes(Vec<u8>),
    Empty,
}

/// A single DIF/DIFE/VIF/VIFE record, with its value already decoded to a
/// `RecordValue` but not yet mapped to a named quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub dif: u8,
    pub difes: Vec<u8>,
    pub vif: u8,
    pub vifes: Vec<u8>,
    pub raw: Vec<u8>,
    pub value: RecordValue,
    /// True for the special DIF markers (manufacturer-specific, more-
    /// records-follow, idle filler); such records carry no VIF/value.
    pub special: bool,
}

/// Parses the twelve-byte fixed header at the start of a long-frame
/// payload. Returns `None` if the payload is too short to contain one, in
/// which case the whole payload is treated as the record stream (matches
/// the original reader's `if len(data) >= 12` guard).
pub fn parse_fixed_header(payload: &[u8]) -> Option<(FixedHeader, &[u8])> {
    if payload.len() < 12 {
        return None;
    }
    let id = decode_bcd_le(&payload[0..4]) as u32;
    let manufacturer_word = u16::from_le_bytes([payload[4], payload[5]]);
    let header = FixedHeader {
        id,
        manufacturer: manufacturer_from_word(manufacturer_word),
        version: payload[6],
        medium: payload[7],
        access_no: payload[8],
        status: payload[9],
        signature: u16::from_le_bytes([payload[10], payload[11]]),
    };
    Some((header, &payload[12..]))
}

/// DIF low-nibble -> field kind, per EN 13757-3 Table 5.
enum FieldKind {
    UInt(usize),
    Float,
    Bcd(usize),
    Lvar,
    /// No data associated (DIF `0x0` "no data" or `0x8` special function).
    None,
}

fn field_kind_for(dif: u8) -> FieldKind {
    match dif & MBUS_DATA_RECORD_DIF_MASK_DATA {
        0x1 => FieldKind::UInt(1),
        0x2 => FieldKind::UInt(2),
        0x3 => FieldKind::UInt(3),
        0x4 => FieldKind::UInt(4),
        0x6 => FieldKind::UInt(6),
        0x7 => FieldKind::UInt(8),
        0x5 => FieldKind::Float,
        0x9 => FieldKind::Bcd(1),
        0xA => FieldKind::Bcd(2),
        0xB => FieldKind::Bcd(3),
        0xC => FieldKind::Bcd(4),
        0xE => FieldKind::Bcd(6),
        0xD => FieldKind::Lvar,
        _ => FieldKind::None,
    }
}

fn take_byte(i: &[u8]) -> IResult<&[u8], u8> {
    be_u8(i)
}

/// Reads a continuation-bit chain (DIFE or VIFE bytes): each byte with its
/// kind's extension bit set is followed by another byte of the same kind.
/// `extension_bit` is `MBUS_DIB_DIF_EXTENSION_BIT` for a DIFE chain or
/// `MBUS_DIB_VIF_EXTENSION_BIT` for a VIFE chain (both `0x80`, per EN
/// 13757-3, but kept as distinct named constants per field).
fn take_extension_chain(mut i: &[u8], first: u8, extension_bit: u8) -> (&[u8], Vec<u8>) {
    let mut chain = Vec::new();
    let mut current = first;
    while current & extension_bit != 0 {
        match take_byte(i) {
            Ok((rest, b)) => {
                chain.push(b);
                current = b;
                i = rest;
            }
            Err(_) => break,
        }
    }
    (i, chain)
}

/// Parses every record out of the record-stream bytes following the fixed
/// header (or the whole payload, if it was too short to carry one).
/// Truncated trailing data simply ends the stream; it is never an error.
pub fn parse_records(payload: &[u8]) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut input = payload;

    loop {
        let (rest, dif) = match take_byte(input) {
            Ok(v) => v,
            Err(_) => break,
        };
        input = rest;

        if dif == MBUS_DIB_DIF_MANUFACTURER_SPECIFIC
            || dif == MBUS_DIB_DIF_MORE_RECORDS_FOLLOW
            || dif == MBUS_DIB_DIF_IDLE_FILLER
        {
            records.push(RawRecord {
                dif,
                difes: Vec::new(),
                vif: 0,
                vifes: Vec::new(),
                raw: Vec::new(),
                value: RecordValue::Empty,
                special: true,
            });
            continue;
        }

        let (rest, difes) = take_extension_chain(input, dif, MBUS_DIB_DIF_EXTENSION_BIT);
        input = rest;

        let (rest, vif) = match take_byte(input) {
            Ok(v) => v,
            Err(_) => break,
        };
        input = rest;

        let (rest, vifes) = take_extension_chain(input, vif, MBUS_DIB_VIF_EXTENSION_BIT);
        input = rest;

        let kind = field_kind_for(dif);
        let (rest, raw, value) = match kind {
            FieldKind::UInt(size) => match take::<_, _, nom::error::Error<&[u8]>>(size)(input) {
                Ok((rest, bytes)) => {
                    let v = decode_uint_le(bytes).unwrap_or(0);
                    (rest, bytes.to_vec(), RecordValue::UInt(v))
                }
                Err(_) => break,
            },
            FieldKind::Float => match take::<_, _, nom::error::Error<&[u8]>>(4usize)(input) {
                Ok((rest, bytes)) => {
                    let arr: [u8; 4] = bytes.try_into().expect("take(4) yields 4 bytes");
                    (rest, bytes.to_vec(), RecordValue::Float(decode_f32_le(&arr)))
                }
                Err(_) => break,
            },
            FieldKind::Bcd(size) => match take::<_, _, nom::error::Error<&[u8]>>(size)(input) {
                Ok((rest, bytes)) => {
                    let v = decode_bcd_le(bytes);
                    (rest, bytes.to_vec(), RecordValue::Decimal(v))
                }
                Err(_) => break,
            },
            FieldKind::Lvar => {
                let (rest, length) = match take_byte(input) {
                    Ok(v) => v,
                    Err(_) => break,
                };
                match take::<_, _, nom::error::Error<&[u8]>>(length as usize)(rest) {
                    Ok((rest, bytes)) => (rest, bytes.to_vec(), RecordValue::Bytes(bytes.to_vec())),
                    Err(_) => break,
                }
            }
            FieldKind::None => (input, Vec::new(), RecordValue::Empty),
        };
        input = rest;

        records.push(RawRecord {
            dif,
            difes,
            vif,
            vifes,
            raw,
            value,
            special: false,
        });
    }

    records
}

/// True if `vif` carries the EN 13757-3 extension marker (`0xFD`), meaning
/// its quantity is determined by the first VIFE byte rather than the VIF
/// itself.
pub fn is_extension_vif(vif: u8) -> bool {
    vif == 0xFD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fixed_header_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0x42, 0x65, 0x07, 0x00]); // BCD id -> 765 42? see assertion below
        bytes.extend_from_slice(&[0x01, 0x24]); // manufacturer word
        bytes.push(0x01); // version
        bytes.push(0x04); // medium
        bytes.push(0x00); // access_no
        bytes.push(0x00); // status
        bytes.extend_from_slice(&[0x00, 0x00]); // signature
        bytes
    }

    #[test]
    fn parses_fixed_header_when_present() {
        let header_bytes = sample_fixed_header_bytes();
        let mut payload = header_bytes.clone();
        payload.push(0x2F); // idle filler so the record loop has something benign to parse
        let (header, rest) = parse_fixed_header(&payload).unwrap();
        assert_eq!(header.version, 0x01);
        assert_eq!(header.medium, 0x04);
        assert_eq!(rest, &[0x2F]);
    }

    #[test]
    fn returns_none_for_short_payload() {
        assert!(parse_fixed_header(&[0x01, 0x02, 0x03]).is_none());
    }

    #[test]
    fn parses_a_single_uint_record() {
        // DIF=0x04 (4-byte uint), VIF=0x06 (energy), value = 1000 LE
        let payload = [0x04, 0x06, 0xE8, 0x03, 0x00, 0x00];
        let records = parse_records(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dif, 0x04);
        assert_eq!(records[0].vif, 0x06);
        assert_eq!(records[0].value, RecordValue::UInt(1000));
    }

    #[test]
    fn parses_bcd_record() {
        // DIF=0x0C (4-byte BCD), VIF=0x14, value bytes encode 12345 (0.01 m3 units)
        let payload = [0x0C, 0x14, 0x45, 0x23, 0x01, 0x00];
        let records = parse_records(&payload);
        assert_eq!(records[0].value, RecordValue::Decimal(12345));
    }

    #[test]
    fn parses_lvar_record() {
        // DIF=0x0D (LVAR), VIF=0x7C (custom ascii text) length 3 "abc"
        let payload = [0x0D, 0x7C, 0x03, b'a', b'b', b'c'];
        let records = parse_records(&payload);
        assert_eq!(records[0].value, RecordValue::Bytes(vec![b'a', b'b', b'c']));
    }

    #[test]
    fn special_dif_marks_record_as_special_and_continues() {
        let payload = [0x0F, 0x04, 0x06, 0x01, 0x00, 0x00, 0x00];
        let records = parse_records(&payload);
        assert_eq!(records.len(), 2);
        assert!(records[0].special);
        assert!(!records[1].special);
    }

    #[test]
    fn truncated_record_stops_without_panicking() {
        // DIF says 4-byte uint but only 2 bytes are available
        let payload = [0x04, 0x06, 0x01, 0x02];
        let records = parse_records(&payload);
        assert!(records.is_empty());
    }

    #[test]
    fn difes_and_vifes_are_collected_as_continuation_chains() {
        // DIF=0x84 (4-byte uint, extension bit set) -> DIFE 0x10 (no further ext)
        // VIF=0x93 (extension bit set) -> VIFE 0x20 (no further ext)
        let payload = [0x84, 0x10, 0x93, 0x20, 0x01, 0x00, 0x00, 0x00];
        let records = parse_records(&payload);
        assert_eq!(records[0].difes, vec![0x10]);
        assert_eq!(records[0].vifes, vec![0x20]);
    }
}
