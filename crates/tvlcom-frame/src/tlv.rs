use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::MAX_DATA_LENGTH;
use crate::error::{FrameError, Result};
use crate::types::TlvTypes;

/// TLV record header: type (1) + length (1).
pub const TLV_HEADER_SIZE: usize = 2;

/// Largest value a single length byte can describe.
pub const MAX_VALUE_LENGTH: usize = u8::MAX as usize;

/// Fixed-point scale used for physical quantities (voltage, current, power,
/// temperature) carried in 32-bit integer records.
pub const SCALE_FACTOR: f32 = 10_000.0;

/// One decoded `Type | Length | Value` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvRecord {
    /// The record type.
    pub tlv_type: u8,
    /// The raw value bytes (at most 255).
    pub value: Bytes,
}

impl TlvRecord {
    /// Create a record, rejecting values longer than one length byte allows.
    pub fn new(tlv_type: u8, value: impl Into<Bytes>) -> Result<Self> {
        let value = value.into();
        check_value_len(value.len())?;
        Ok(Self { tlv_type, value })
    }

    /// The encoded size of this record.
    pub fn wire_size(&self) -> usize {
        TLV_HEADER_SIZE + self.value.len()
    }

    /// Append the encoded record to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        put_record(self.tlv_type, &self.value, dst);
    }

    /// The value as a little-endian `u32`, if it is exactly four bytes.
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_ref().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// The value as a little-endian `i32`, if it is exactly four bytes.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_u32().map(|v| v as i32)
    }

    /// The value as a fixed-point quantity (`i32 / 10000`).
    pub fn as_scaled(&self) -> Option<f32> {
        self.as_i32().map(|v| v as f32 / SCALE_FACTOR)
    }

    /// The value as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// The command byte of a control record.
    pub fn as_command(&self) -> Option<u8> {
        self.value.first().copied()
    }
}

/// Encode one record into `dst`.
///
/// Nothing is written if the value is longer than 255 bytes.
pub fn encode_tlv(tlv_type: u8, value: &[u8], dst: &mut BytesMut) -> Result<()> {
    check_value_len(value.len())?;
    put_record(tlv_type, value, dst);
    Ok(())
}

/// Encode a little-endian unsigned 32-bit integer record.
pub fn encode_u32(tlv_type: u8, value: u32, dst: &mut BytesMut) {
    put_record(tlv_type, &value.to_le_bytes(), dst);
}

/// Encode a little-endian signed 32-bit integer record.
pub fn encode_i32(tlv_type: u8, value: i32, dst: &mut BytesMut) {
    put_record(tlv_type, &value.to_le_bytes(), dst);
}

/// Encode a fixed-point quantity as `i32(value * 10000)`, truncated toward zero.
pub fn encode_scaled(tlv_type: u8, value: f32, dst: &mut BytesMut) {
    encode_i32(tlv_type, (value * SCALE_FACTOR) as i32, dst);
}

/// Encode a UTF-8 string record.
pub fn encode_str(tlv_type: u8, text: &str, dst: &mut BytesMut) -> Result<()> {
    encode_tlv(tlv_type, text.as_bytes(), dst)
}

/// Encode a single-byte control command record.
pub fn encode_control(tlv_type: u8, command: u8, dst: &mut BytesMut) {
    put_record(tlv_type, &[command], dst);
}

/// Decode a TLV data region into records, in stream order.
///
/// An empty buffer yields no records. Value bytes are shared with `buf`, not copied.
pub fn decode_tlvs(buf: impl Into<Bytes>) -> Result<Vec<TlvRecord>> {
    let buf = buf.into();
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let available = buf.len() - offset;
        if available < TLV_HEADER_SIZE {
            return Err(FrameError::MalformedTlv {
                offset,
                needed: TLV_HEADER_SIZE,
                available,
            });
        }

        let tlv_type = buf[offset];
        let len = buf[offset + 1] as usize;
        let start = offset + TLV_HEADER_SIZE;
        let end = start + len;
        if end > buf.len() {
            return Err(FrameError::MalformedTlv {
                offset,
                needed: TLV_HEADER_SIZE + len,
                available,
            });
        }

        records.push(TlvRecord {
            tlv_type,
            value: buf.slice(start..end),
        });
        offset = end;
    }

    Ok(records)
}

fn check_value_len(len: usize) -> Result<()> {
    if len > MAX_VALUE_LENGTH {
        return Err(FrameError::ValueTooLarge {
            size: len,
            max: MAX_VALUE_LENGTH,
        });
    }
    Ok(())
}

fn put_record(tlv_type: u8, value: &[u8], dst: &mut BytesMut) {
    dst.reserve(TLV_HEADER_SIZE + value.len());
    dst.put_u8(tlv_type);
    dst.put_u8(value.len() as u8);
    dst.put_slice(value);
}

/// Accumulates records into a frame payload.
///
/// Every push is checked against the 240-byte data limit, so a finished
/// builder always fits in one frame.
#[derive(Debug, Clone)]
pub struct TlvBuilder {
    types: TlvTypes,
    buf: BytesMut,
    count: usize,
}

impl TlvBuilder {
    /// Create a builder using the default reserved type set.
    pub fn new() -> Self {
        Self::with_types(TlvTypes::default())
    }

    /// Create a builder for a specific reserved type set.
    pub fn with_types(types: TlvTypes) -> Self {
        Self {
            types,
            buf: BytesMut::with_capacity(MAX_DATA_LENGTH),
            count: 0,
        }
    }

    /// Append a raw record.
    pub fn raw(&mut self, tlv_type: u8, value: &[u8]) -> Result<&mut Self> {
        check_value_len(value.len())?;
        let size = self.buf.len() + TLV_HEADER_SIZE + value.len();
        if size > MAX_DATA_LENGTH {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: MAX_DATA_LENGTH,
            });
        }
        put_record(tlv_type, value, &mut self.buf);
        self.count += 1;
        Ok(self)
    }

    /// Append a control command record.
    pub fn control(&mut self, command: u8) -> Result<&mut Self> {
        self.raw(self.types.control, &[command])
    }

    /// Append an integer record using the reserved integer type.
    pub fn integer(&mut self, value: u32) -> Result<&mut Self> {
        self.u32(self.types.integer, value)
    }

    /// Append a string record using the reserved string type.
    pub fn string(&mut self, text: &str) -> Result<&mut Self> {
        self.raw(self.types.string, text.as_bytes())
    }

    /// Append a little-endian `u32` record of any type.
    pub fn u32(&mut self, tlv_type: u8, value: u32) -> Result<&mut Self> {
        self.raw(tlv_type, &value.to_le_bytes())
    }

    /// Append a little-endian `i32` record of any type.
    pub fn i32(&mut self, tlv_type: u8, value: i32) -> Result<&mut Self> {
        self.raw(tlv_type, &value.to_le_bytes())
    }

    /// Append a fixed-point quantity record.
    pub fn scaled(&mut self, tlv_type: u8, value: f32) -> Result<&mut Self> {
        self.i32(tlv_type, (value * SCALE_FACTOR) as i32)
    }

    /// Encoded payload length so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no records were added.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of records added.
    pub fn record_count(&self) -> usize {
        self.count
    }

    /// The encoded payload so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The reserved type set this builder encodes against.
    pub fn types(&self) -> &TlvTypes {
        &self.types
    }

    /// Finish and return the payload.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for TlvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
