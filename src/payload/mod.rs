//! Payload decoding: the fixed header / variable record parser and the
//! VIF-to-quantity mapper for the UltraLite PRO vendor profile.

pub mod record;
pub mod vif;

pub use record::{FixedHeader, RawRecord, RecordValue};
pub use vif::{decode, decode_extension, DecodedQuantity, QuantityValue, TransformKind};
