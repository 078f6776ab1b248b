//! Wire-level reading utilities for replay sub-streams.
//!
//! This module provides a bounds-checked cursor over raw sub-stream bytes
//! and a decoder for the self-describing tagged serialization used by the
//! replay header and the versioned sub-streams. All functions perform
//! bounds checking and return appropriate errors for truncated or
//! malformed data.
//!
//! # Endianness
//!
//! Fixed-width integers are stored in little-endian byte order. Variable
//! length integers carry their sign in the lowest bit of the first byte.
//!
//! # Tagged values
//!
//! Every versioned value starts with a one-byte type tag:
//!
//! | Tag  | Shape    | Payload                                      |
//! |------|----------|----------------------------------------------|
//! | 0x00 | array    | vint count, then that many values            |
//! | 0x01 | bitblob  | vint bit count, then `ceil(bits / 8)` bytes  |
//! | 0x02 | blob     | vint byte count, then the bytes              |
//! | 0x03 | choice   | vint alternative tag, then one value         |
//! | 0x04 | optional | u8 presence flag, then one value if nonzero  |
//! | 0x05 | struct   | vint field count, then (vint tag, value)*    |
//! | 0x06 | u8       | one byte                                     |
//! | 0x07 | u32      | four bytes LE                                |
//! | 0x08 | u64      | eight bytes LE                               |
//! | 0x09 | vint     | variable-length signed integer               |
//!
//! # Example
//!
//! ```
//! use stormreplay::wire::ByteReader;
//!
//! let data = [0x09, 0x12]; // vint value 9
//! let mut reader = ByteReader::new(&data);
//! let value = reader.read_versioned().unwrap();
//! assert_eq!(value.as_int(), Some(9));
//! ```

use crate::error::{ReplayError, Result};
use crate::value::Value;

/// Type tag for array values.
const TAG_ARRAY: u8 = 0x00;
/// Type tag for bit-array values.
const TAG_BITBLOB: u8 = 0x01;
/// Type tag for byte-string values.
const TAG_BLOB: u8 = 0x02;
/// Type tag for tagged-union values.
const TAG_CHOICE: u8 = 0x03;
/// Type tag for optional values.
const TAG_OPTIONAL: u8 = 0x04;
/// Type tag for struct values.
const TAG_STRUCT: u8 = 0x05;
/// Type tag for one-byte integers.
const TAG_U8: u8 = 0x06;
/// Type tag for four-byte integers.
const TAG_U32: u8 = 0x07;
/// Type tag for eight-byte integers.
const TAG_U64: u8 = 0x08;
/// Type tag for variable-length integers.
const TAG_VINT: u8 = 0x09;

/// A bounds-checked forward cursor over a byte slice.
///
/// Every read advances the cursor and fails with
/// [`ReplayError::UnexpectedEof`] when the slice is exhausted, so decode
/// code can propagate truncation with `?` instead of slicing manually.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, offset: 0 }
    }

    /// Returns the current byte offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Returns `true` when every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::UnexpectedEof` when no bytes remain.
    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::UnexpectedEof` when fewer than 4 bytes remain.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a little-endian u64.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::UnexpectedEof` when fewer than 8 bytes remain.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads `len` bytes and advances past them.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::UnexpectedEof` when fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or_else(|| ReplayError::unexpected_eof(usize::MAX, self.data.len()))?;
        if end > self.data.len() {
            return Err(ReplayError::unexpected_eof(end, self.data.len()));
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Reads a variable-length signed integer.
    ///
    /// The first byte carries the sign in bit 0 and six payload bits;
    /// each byte's high bit marks a continuation carrying seven more
    /// payload bits.
    ///
    /// # Errors
    ///
    /// - `ReplayError::UnexpectedEof` on truncation
    /// - `ReplayError::ProtocolDecode` when the encoding exceeds 64 bits
    ///
    /// # Example
    ///
    /// ```
    /// use stormreplay::wire::ByteReader;
    ///
    /// // 29406 = 0b111001011011110; sign 0, low 6 bits then 7-bit groups
    /// let mut reader = ByteReader::new(&[0xBC, 0xCB, 0x03]);
    /// assert_eq!(reader.read_vint().unwrap(), 29406);
    /// ```
    pub fn read_vint(&mut self) -> Result<i64> {
        let first = self.read_u8()?;
        let negative = first & 0x01 != 0;
        let mut value = i64::from((first >> 1) & 0x3F);
        let mut shift = 6u32;
        let mut byte = first;

        while byte & 0x80 != 0 {
            if shift > 62 {
                return Err(ReplayError::decode(format!(
                    "variable-length integer exceeds 64 bits at offset {}",
                    self.offset
                )));
            }
            byte = self.read_u8()?;
            let group = byte & 0x7F;
            // At shift 62 only the lowest payload bit still fits the
            // magnitude; anything above would be shifted out or land on
            // the sign bit
            if shift == 62 && group & 0x7E != 0 {
                return Err(ReplayError::decode(format!(
                    "variable-length integer exceeds 64 bits at offset {}",
                    self.offset
                )));
            }
            value |= i64::from(group) << shift;
            shift += 7;
        }

        Ok(if negative { -value } else { value })
    }

    /// Reads a vint and validates it as a non-negative element count.
    fn read_count(&mut self, what: &str) -> Result<usize> {
        let count = self.read_vint()?;
        usize::try_from(count).map_err(|_| {
            ReplayError::decode(format!(
                "negative {what} count {count} at offset {}",
                self.offset
            ))
        })
    }

    /// Reads one self-describing tagged value.
    ///
    /// # Errors
    ///
    /// - `ReplayError::UnexpectedEof` on truncation
    /// - `ReplayError::ProtocolDecode` on an unknown type tag or an
    ///   integer that does not fit the decoded representation
    pub fn read_versioned(&mut self) -> Result<Value> {
        let tag_offset = self.offset;
        let tag = self.read_u8()?;

        match tag {
            TAG_ARRAY => {
                let count = self.read_count("array element")?;
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_versioned()?);
                }
                Ok(Value::Array(items))
            }
            TAG_BITBLOB => {
                let bits = self.read_count("bit")?;
                let data = self.read_bytes(bits.div_ceil(8))?.to_vec();
                Ok(Value::BitArray { bits, data })
            }
            TAG_BLOB => {
                let len = self.read_count("byte")?;
                Ok(Value::Blob(self.read_bytes(len)?.to_vec()))
            }
            TAG_CHOICE => {
                let tag = u32::try_from(self.read_vint()?).map_err(|_| {
                    ReplayError::decode(format!("invalid choice tag at offset {tag_offset}"))
                })?;
                let value = Box::new(self.read_versioned()?);
                Ok(Value::Choice { tag, value })
            }
            TAG_OPTIONAL => {
                if self.read_u8()? == 0 {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Optional(Box::new(self.read_versioned()?)))
                }
            }
            TAG_STRUCT => {
                let count = self.read_count("struct field")?;
                let mut fields = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let field_tag = u32::try_from(self.read_vint()?).map_err(|_| {
                        ReplayError::decode(format!(
                            "invalid struct field tag at offset {}",
                            self.offset
                        ))
                    })?;
                    fields.push((field_tag, self.read_versioned()?));
                }
                Ok(Value::Struct(fields))
            }
            TAG_U8 => Ok(Value::Int(i64::from(self.read_u8()?))),
            TAG_U32 => Ok(Value::Int(i64::from(self.read_u32_le()?))),
            TAG_U64 => {
                let raw = self.read_u64_le()?;
                let value = i64::try_from(raw).map_err(|_| {
                    ReplayError::decode(format!(
                        "u64 value {raw} at offset {tag_offset} does not fit a signed integer"
                    ))
                })?;
                Ok(Value::Int(value))
            }
            TAG_VINT => Ok(Value::Int(self.read_vint()?)),
            other => Err(ReplayError::decode(format!(
                "unknown type tag 0x{other:02X} at offset {tag_offset}"
            ))),
        }
    }
}

/// Decodes a single tagged value from the front of `data`.
///
/// Trailing bytes after the value are not an error; sub-streams are
/// allowed to carry padding after their root record.
///
/// # Errors
///
/// Propagates the [`ByteReader::read_versioned`] failure modes.
pub fn decode_versioned(data: &[u8]) -> Result<Value> {
    ByteReader::new(data).read_versioned()
}
