use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::Crc16;
use crate::error::{FrameError, Result};
use crate::tlv::{decode_tlvs, TlvRecord};
use crate::types::{AckKind, TlvTypes};

/// Frame header: the two sync bytes.
pub const HEADER: [u8; 2] = [0xF0, 0x0F];

/// Frame tail.
pub const TAIL: [u8; 2] = [0xE0, 0x0D];

/// Maximum TLV data carried by one frame.
pub const MAX_DATA_LENGTH: usize = 240;

/// Header (2) + frame id (1) + length (1) + CRC (2) + tail (2).
pub const OVERHEAD: usize = 8;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = OVERHEAD + MAX_DATA_LENGTH;

/// An outgoing frame: id plus encoded TLV payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame identifier echoed back in ACK/NACK replies.
    pub id: u8,
    /// Concatenated TLV records.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        OVERHEAD + self.payload.len()
    }

    /// Decode the payload into records.
    pub fn records(&self) -> Result<Vec<TlvRecord>> {
        decode_tlvs(self.payload.clone())
    }
}

/// A frame that passed CRC and tail checks, with its payload decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Frame identifier.
    pub id: u8,
    /// Records in stream order.
    pub records: Vec<TlvRecord>,
}

impl ReceivedFrame {
    /// Returns true if the frame carries records and all are ACK/NACK.
    pub fn is_ack_only(&self, types: &TlvTypes) -> bool {
        !self.records.is_empty()
            && self
                .records
                .iter()
                .all(|record| types.is_ack_or_nack(record.tlv_type))
    }
}

/// CRC16 over `frame_id || length || payload`.
pub fn frame_crc(frame_id: u8, payload: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update_byte(frame_id);
    crc.update_byte(payload.len() as u8);
    crc.update(payload);
    crc.value()
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬─────────┬─────────┬──────────────┬───────────┬───────────┐
/// │ Header    │ FrameID │ DataLen │ TLV payload  │ CRC16     │ Tail      │
/// │ 0xF0 0x0F │ (1B)    │ (1B)    │ (0..240B)    │ (2B BE)   │ 0xE0 0x0D │
/// └───────────┴─────────┴─────────┴──────────────┴───────────┴───────────┘
/// ```
///
/// Nothing is written if the payload exceeds [`MAX_DATA_LENGTH`].
pub fn encode_frame(frame_id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_DATA_LENGTH {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_DATA_LENGTH,
        });
    }
    put_frame(frame_id, payload, dst);
    Ok(())
}

/// Build a complete frame.
pub fn build_frame(frame_id: u8, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(OVERHEAD + payload.len());
    encode_frame(frame_id, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Build an ACK or NACK frame for `acked_id`, sent with frame id `reply_id`.
pub fn build_reply(kind: AckKind, types: &TlvTypes, acked_id: u8, reply_id: u8) -> Bytes {
    let payload = [types.ack_type(kind), 1, acked_id];
    let mut buf = BytesMut::with_capacity(OVERHEAD + payload.len());
    put_frame(reply_id, &payload, &mut buf);
    buf.freeze()
}

/// ACK for `acked_id`, framed with id 0.
pub fn build_ack(types: &TlvTypes, acked_id: u8) -> Bytes {
    build_reply(AckKind::Ack, types, acked_id, 0)
}

/// NACK for `acked_id`, framed with id 0.
pub fn build_nack(types: &TlvTypes, acked_id: u8) -> Bytes {
    build_reply(AckKind::Nack, types, acked_id, 0)
}

fn put_frame(frame_id: u8, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(OVERHEAD + payload.len());
    dst.put_slice(&HEADER);
    dst.put_u8(frame_id);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    dst.put_u16(frame_crc(frame_id, payload));
    dst.put_slice(&TAIL);
}

/// Configuration for frame readers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum bytes requested from the transport per read. Default: 256.
    pub read_chunk_size: usize,
    /// Sleep between empty reads in blocking operations. Default: 1 ms.
    pub idle_backoff: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 256,
            idle_backoff: Duration::from_millis(1),
        }
    }
}
