//! Generic structured values produced by protocol decoders.
//!
//! Replay sub-streams decode into deeply nested records whose exact shape
//! varies between base builds. Rather than defining one static type per
//! build, all decoders share a single tagged [`Value`] type (scalar, blob,
//! sequence, struct) with typed accessors at the point of use.
//!
//! Struct fields are keyed by their wire field tag and kept in decode
//! order, so a value round-trips the layout the decoder saw.
//!
//! # Example
//!
//! ```
//! use stormreplay::value::Value;
//!
//! let record = Value::Struct(vec![
//!     (0, Value::Int(42)),
//!     (1, Value::Blob(b"MapName".to_vec())),
//! ]);
//!
//! assert_eq!(record.field(0).and_then(Value::as_int), Some(42));
//! assert_eq!(record.field(1).and_then(Value::as_str), Some("MapName"));
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A decoded wire value.
///
/// One variant per shape the versioned wire format can carry. Values are
/// immutable once decoded; consumers navigate them with the accessor
/// methods below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// The absent alternative of an optional value.
    Null,

    /// A signed integer (all wire integer widths normalize to `i64`).
    Int(i64),

    /// A length-prefixed byte string. Player names, map titles and
    /// similar text fields arrive as UTF-8 blobs.
    Blob(Vec<u8>),

    /// A bit array with an explicit bit count.
    BitArray {
        /// Number of significant bits.
        bits: usize,
        /// Packed bit data, least significant bits first.
        data: Vec<u8>,
    },

    /// An ordered sequence of values.
    Array(Vec<Value>),

    /// A struct as a list of `(field tag, value)` pairs in decode order.
    Struct(Vec<(u32, Value)>),

    /// A present optional value.
    Optional(Box<Value>),

    /// A tagged union alternative.
    Choice {
        /// The alternative's tag.
        tag: u32,
        /// The carried value.
        value: Box<Value>,
    },
}

impl Value {
    /// Returns the integer payload, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer payload as a `u32`, if this is a
    /// non-negative `Int` that fits.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the raw bytes, if this is a `Blob`.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the blob interpreted as UTF-8, if this is a `Blob`
    /// holding valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Blob(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the element slice, if this is an `Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the field pairs, if this is a `Struct`.
    #[must_use]
    pub fn as_struct(&self) -> Option<&[(u32, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a struct field by its wire tag.
    ///
    /// Returns `None` when the value is not a struct or the tag is
    /// absent. Present optionals are looked through, so a field wrapped
    /// in `Optional` resolves to its inner value.
    #[must_use]
    pub fn field(&self, tag: u32) -> Option<&Value> {
        let fields = self.as_struct()?;
        let value = fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)?;
        match value {
            Value::Optional(inner) => Some(inner),
            other => Some(other),
        }
    }

    /// Returns `true` when this is `Null` or an empty optional slot.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// JSON-friendly serialization for CLI output: struct tags become string
// keys, blobs become (lossy) strings, bit arrays keep their bit count.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Blob(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Value::BitArray { bits, data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("bits", bits)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (tag, value) in fields {
                    map.serialize_entry(&tag.to_string(), value)?;
                }
                map.end()
            }
            Value::Optional(inner) => inner.serialize(serializer),
            Value::Choice { tag, value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", tag)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_int() {
        assert_eq!(Value::Int(-7).as_int(), Some(-7));
        assert_eq!(Value::Null.as_int(), None);
    }

    #[test]
    fn test_as_u32() {
        assert_eq!(Value::Int(29406).as_u32(), Some(29406));
        assert_eq!(Value::Int(-1).as_u32(), None);
        assert_eq!(Value::Blob(vec![]).as_u32(), None);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(Value::Blob(b"Sky Temple".to_vec()).as_str(), Some("Sky Temple"));
        assert_eq!(Value::Blob(vec![0xFF, 0xFE]).as_str(), None);
        assert_eq!(Value::Int(1).as_str(), None);
    }

    #[test]
    fn test_field_lookup() {
        let record = Value::Struct(vec![
            (0, Value::Int(1)),
            (5, Value::Int(29406)),
        ]);

        assert_eq!(record.field(5).and_then(Value::as_int), Some(29406));
        assert!(record.field(9).is_none());
        assert!(Value::Int(0).field(0).is_none());
    }

    #[test]
    fn test_field_looks_through_optional() {
        let record = Value::Struct(vec![(2, Value::Optional(Box::new(Value::Int(8))))]);
        assert_eq!(record.field(2).and_then(Value::as_int), Some(8));
    }

    #[test]
    fn test_json_serialization() {
        let record = Value::Struct(vec![
            (0, Value::Int(3)),
            (1, Value::Blob(b"Alarak".to_vec())),
            (2, Value::Array(vec![Value::Int(1), Value::Int(2)])),
            (3, Value::Null),
        ]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["0"], 3);
        assert_eq!(json["1"], "Alarak");
        assert_eq!(json["2"][1], 2);
        assert!(json["3"].is_null());
    }

    #[test]
    fn test_bitarray_serialization() {
        let value = Value::BitArray {
            bits: 12,
            data: vec![0xAB, 0x0C],
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["bits"], 12);
        assert_eq!(json["data"][0], 0xAB);
    }
}
