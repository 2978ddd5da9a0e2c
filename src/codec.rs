//! Pure numeric/text decoders shared by the record parser and VIF mapper.
//!
//! These operate on already-delimited byte slices (the record parser has
//! already worked out how many bytes a field occupies), so unlike the
//! framer and record parser they are plain functions rather than `nom`
//! combinators.

/// Decodes a little-endian packed-BCD byte string into an integer,
/// skipping any nibble greater than 9 (used by the meter for "no digit"
/// padding). Byte 0 holds the least significant digit pair. An input with
/// no valid digits at all decodes to 0.
pub fn decode_bcd_le(data: &[u8]) -> u64 {
    let mut digits = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        let lo = byte & 0x0F;
        let hi = (byte >> 4) & 0x0F;
        if lo <= 9 {
            digits.push(lo);
        }
        if hi <= 9 {
            digits.push(hi);
        }
    }
    digits
        .iter()
        .rev()
        .fold(0u64, |acc, &d| acc * 10 + d as u64)
}

/// Encodes an integer back into little-endian packed BCD occupying exactly
/// `width` bytes. Test-only: the read path never needs to re-encode a
/// decoded value, this exists to state the round-trip law in
/// `codec_tests.rs`.
#[cfg(test)]
pub fn encode_bcd_le(mut value: u64, width: usize) -> Vec<u8> {
    let mut digits = Vec::with_capacity(width * 2);
    for _ in 0..width * 2 {
        digits.push((value % 10) as u8);
        value /= 10;
    }
    digits
        .chunks(2)
        .map(|pair| pair[0] | (pair[1] << 4))
        .collect()
}

/// Decodes a three-letter manufacturer code from the 16-bit word stored in
/// the fixed header, per EN 13757-3 (three 5-bit fields, each offset by 64
/// into the ASCII alphabet). A field outside `A..=Z` decodes to `?`.
pub fn manufacturer_from_word(word: u16) -> String {
    let c1 = ((word >> 10) & 0x1F) as u8 + 64;
    let c2 = ((word >> 5) & 0x1F) as u8 + 64;
    let c3 = (word & 0x1F) as u8 + 64;
    [c1, c2, c3]
        .iter()
        .map(|&c| if (65..=90).contains(&c) { c as char } else { '?' })
        .collect()
}

/// Decodes a little-endian unsigned integer occupying 1, 2, 3, 4, 6 or 8
/// bytes. Returns `None` for any other width, or if `data.len()` doesn't
/// match the requested width.
pub fn decode_uint_le(data: &[u8]) -> Option<u64> {
    match data.len() {
        1 | 2 | 3 | 4 | 6 | 8 => Some(
            data.iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | b as u64),
        ),
        _ => None,
    }
}

/// Decodes a 4-byte IEEE-754 little-endian float.
pub fn decode_f32_le(data: &[u8; 4]) -> f32 {
    f32::from_le_bytes(*data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_plain_bcd() {
        // 0x12 0x34 little-endian -> digits in order [2,1,4,3] reversed -> "3412"
        assert_eq!(decode_bcd_le(&[0x12, 0x34]), 3412);
    }

    #[test]
    fn decodes_bcd_with_no_data() {
        assert_eq!(decode_bcd_le(&[]), 0);
    }

    #[test]
    fn decodes_bcd_skipping_invalid_nibbles() {
        // 0xFF has both nibbles > 9, contributes no digits: only byte 0's
        // digits [2, 1] survive, reversed and joined as "12"
        assert_eq!(decode_bcd_le(&[0x12, 0xFF]), 12);
    }

    #[test]
    fn manufacturer_itron_example() {
        // ITW packed per EN13757-3 rules (example word used by the teacher's
        // manufacturer table for a real-world code)
        let word = ((('I' as u16 - 64) & 0x1F) << 10)
            | ((('T' as u16 - 64) & 0x1F) << 5)
            | (('W' as u16 - 64) & 0x1F);
        assert_eq!(manufacturer_from_word(word), "ITW");
    }

    #[test]
    fn manufacturer_out_of_range_field_is_question_mark() {
        // field value 0 -> char 64 '@' is outside 'A'..='Z'
        assert_eq!(manufacturer_from_word(0), "???");
    }

    #[test]
    fn decode_uint_round_trip_1_2_4_8() {
        assert_eq!(decode_uint_le(&[0x2A]), Some(42));
        assert_eq!(decode_uint_le(&[0x00, 0x01]), Some(256));
        assert_eq!(decode_uint_le(&[0x00, 0x00, 0x00, 0x01]), Some(1 << 24));
        assert_eq!(decode_uint_le(&[0, 0, 0, 0, 0, 0, 0, 1]), Some(1u64 << 56));
    }

    #[test]
    fn decode_uint_rejects_unsupported_width() {
        assert_eq!(decode_uint_le(&[0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn decode_float_matches_ieee754() {
        let bytes = 1.5f32.to_le_bytes();
        assert_eq!(decode_f32_le(&bytes), 1.5);
    }

    proptest! {
        #[test]
        fn bcd_round_trips_through_encode(value in 0u64..99_999_999u64) {
            let encoded = encode_bcd_le(value, 4);
            prop_assert_eq!(decode_bcd_le(&encoded), value);
        }

        #[test]
        fn decode_uint_le_matches_manual_little_endian(bytes in proptest::collection::vec(any::<u8>(), 4)) {
            let expected = (bytes[0] as u64)
                | ((bytes[1] as u64) << 8)
                | ((bytes[2] as u64) << 16)
                | ((bytes[3] as u64) << 24);
            prop_assert_eq!(decode_uint_le(&bytes), Some(expected));
        }
    }
}
