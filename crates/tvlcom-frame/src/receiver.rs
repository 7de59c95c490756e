use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

use crate::codec::{ReceivedFrame, HEADER, MAX_DATA_LENGTH, TAIL};
use crate::crc::Crc16;
use crate::error::{FrameError, Result};
use crate::tlv::decode_tlvs;

/// Receiver phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Searching for the two header bytes.
    Sync,
    FrameId,
    DataLen,
    Data,
    CrcHi,
    CrcLo,
    Tail1,
    Tail2,
}

/// Counters for completed frames and recovered errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Bytes consumed.
    pub bytes: u64,
    /// Frames delivered.
    pub frames: u64,
    /// Frames dropped for a declared length above the maximum.
    pub length_errors: u64,
    /// Frames dropped for a CRC mismatch.
    pub crc_errors: u64,
    /// Frames dropped for a bad tail byte.
    pub trailer_errors: u64,
    /// Frames dropped because the payload was not well-formed TLV.
    pub tlv_errors: u64,
}

impl ReceiverStats {
    /// Total frames dropped for any reason.
    pub fn errors(&self) -> u64 {
        self.length_errors + self.crc_errors + self.trailer_errors + self.tlv_errors
    }
}

/// Incremental frame parser.
///
/// Feed it one byte at a time; it yields a [`ReceivedFrame`] when the tail
/// of a valid frame arrives. Any error resets it to header search, so it never
/// stalls outside [`ReceiverState::Sync`] after bad input. The CRC is
/// checked before the payload is decoded. At most one frame is buffered.
///
/// Not meant for concurrent use: one receiver per link, driven by one reader.
#[derive(Debug)]
pub struct FrameReceiver {
    state: ReceiverState,
    sync_index: u8,
    frame_id: u8,
    remaining: usize,
    data: BytesMut,
    crc_hi: u8,
    crc: Crc16,
    stats: ReceiverStats,
}

impl FrameReceiver {
    /// Create a receiver waiting for a header.
    pub fn new() -> Self {
        Self {
            state: ReceiverState::Sync,
            sync_index: 0,
            frame_id: 0,
            remaining: 0,
            data: BytesMut::with_capacity(MAX_DATA_LENGTH),
            crc_hi: 0,
            crc: Crc16::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Current phase.
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Counters since creation.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Drop any partial frame and return to header search.
    pub fn reset(&mut self) {
        self.state = ReceiverState::Sync;
        self.sync_index = 0;
        self.frame_id = 0;
        self.remaining = 0;
        self.data.clear();
        self.crc_hi = 0;
        self.crc.reset();
    }

    /// Consume one byte.
    ///
    /// Returns `Some(Ok(frame))` when a frame completes, `Some(Err(_))` when a
    /// frame is dropped (the receiver has already reset), and `None` otherwise.
    pub fn process_byte(&mut self, byte: u8) -> Option<Result<ReceivedFrame>> {
        self.stats.bytes += 1;

        match self.state {
            ReceiverState::Sync => {
                if self.sync_index == 0 && byte == HEADER[0] {
                    self.sync_index = 1;
                } else if self.sync_index == 1 && byte == HEADER[1] {
                    self.sync_index = 0;
                    self.state = ReceiverState::FrameId;
                } else {
                    // a stray first header byte may still start the real header
                    self.sync_index = u8::from(byte == HEADER[0]);
                }
                None
            }
            ReceiverState::FrameId => {
                self.frame_id = byte;
                self.crc.reset();
                self.crc.update_byte(byte);
                self.state = ReceiverState::DataLen;
                None
            }
            ReceiverState::DataLen => {
                let len = byte as usize;
                if len > MAX_DATA_LENGTH {
                    return self.fail(FrameError::FrameTooLarge {
                        size: len,
                        max: MAX_DATA_LENGTH,
                    });
                }
                self.crc.update_byte(byte);
                self.data.clear();
                if len == 0 {
                    self.state = ReceiverState::CrcHi;
                } else {
                    self.data.reserve(len);
                    self.remaining = len;
                    self.state = ReceiverState::Data;
                }
                None
            }
            ReceiverState::Data => {
                self.data.put_u8(byte);
                self.crc.update_byte(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = ReceiverState::CrcHi;
                }
                None
            }
            ReceiverState::CrcHi => {
                self.crc_hi = byte;
                self.state = ReceiverState::CrcLo;
                None
            }
            ReceiverState::CrcLo => {
                let received = u16::from_be_bytes([self.crc_hi, byte]);
                let expected = self.crc.value();
                if received != expected {
                    return self.fail(FrameError::ChecksumMismatch { expected, received });
                }
                self.state = ReceiverState::Tail1;
                None
            }
            ReceiverState::Tail1 => {
                if byte != TAIL[0] {
                    return self.fail(FrameError::BadTrailer {
                        expected: TAIL[0],
                        found: byte,
                    });
                }
                self.state = ReceiverState::Tail2;
                None
            }
            ReceiverState::Tail2 => {
                if byte != TAIL[1] {
                    return self.fail(FrameError::BadTrailer {
                        expected: TAIL[1],
                        found: byte,
                    });
                }
                Some(self.complete())
            }
        }
    }

    /// Consume a slice, reporting every completed or dropped frame to `on_event`.
    pub fn feed<F>(&mut self, data: &[u8], mut on_event: F)
    where
        F: FnMut(Result<ReceivedFrame>),
    {
        for &byte in data {
            if let Some(event) = self.process_byte(byte) {
                on_event(event);
            }
        }
    }

    /// Consume a slice and collect completed frames. Dropped frames are only logged.
    pub fn feed_frames(&mut self, data: &[u8]) -> Vec<ReceivedFrame> {
        let mut frames = Vec::new();
        self.feed(data, |event| {
            if let Ok(frame) = event {
                frames.push(frame);
            }
        });
        frames
    }

    fn complete(&mut self) -> Result<ReceivedFrame> {
        let id = self.frame_id;
        let data = self.data.split().freeze();
        self.reset();

        match decode_tlvs(data) {
            Ok(records) => {
                self.stats.frames += 1;
                trace!(frame_id = id, records = records.len(), "frame received");
                Ok(ReceivedFrame { id, records })
            }
            Err(err) => {
                self.stats.tlv_errors += 1;
                warn!(frame_id = id, error = %err, "dropping frame");
                Err(err)
            }
        }
    }

    fn fail(&mut self, err: FrameError) -> Option<Result<ReceivedFrame>> {
        match err {
            FrameError::FrameTooLarge { .. } => self.stats.length_errors += 1,
            FrameError::ChecksumMismatch { .. } => self.stats.crc_errors += 1,
            FrameError::BadTrailer { .. } => self.stats.trailer_errors += 1,
            _ => {}
        }
        warn!(frame_id = self.frame_id, error = %err, "dropping frame");
        self.reset();
        Some(Err(err))
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}
