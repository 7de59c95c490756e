//! TVLCOM framing for unreliable byte streams.
//!
//! Every frame on the wire is:
//! - a 2-byte header (`0xF0 0x0F`) the receiver synchronizes on
//! - a frame id and a 1-byte data length (at most 240)
//! - a TLV payload (`Type | Length | Value` records)
//! - a big-endian CRC16-CCITT over id, length, and payload
//! - a 2-byte tail (`0xE0 0x0D`)
//!
//! [`FrameReceiver`] consumes bytes one at a time and recovers from any
//! corruption by returning to header search.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod receiver;
pub mod tlv;
pub mod types;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::TvlcomCodec;
pub use codec::{
    build_ack, build_frame, build_nack, build_reply, encode_frame, frame_crc, Frame, FrameConfig,
    ReceivedFrame, HEADER, MAX_DATA_LENGTH, MAX_FRAME_SIZE, OVERHEAD, TAIL,
};
pub use crc::{crc16, crc16_bitwise, crc16_update, Crc16, CRC16_INIT, CRC16_POLY};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use receiver::{FrameReceiver, ReceiverState, ReceiverStats};
pub use tlv::{decode_tlvs, encode_tlv, TlvBuilder, TlvRecord, MAX_VALUE_LENGTH};
pub use types::{AckKind, TlvTypes};
pub use writer::FrameWriter;
