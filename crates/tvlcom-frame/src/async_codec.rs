//! `tokio_util::codec` adapter for async byte streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, ReceivedFrame};
use crate::error::FrameError;
use crate::receiver::FrameReceiver;

/// Frame codec for `FramedRead`/`FramedWrite`.
///
/// Decoding drives a [`FrameReceiver`], so corrupted frames are skipped the
/// same way the blocking reader skips them.
#[derive(Debug, Default)]
pub struct TvlcomCodec {
    receiver: FrameReceiver,
}

impl TvlcomCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// The receiver behind this codec.
    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }
}

impl Decoder for TvlcomCodec {
    type Item = ReceivedFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            match self.receiver.process_byte(src.get_u8()) {
                Some(Ok(frame)) => return Ok(Some(frame)),
                // already counted and logged by the receiver
                Some(Err(_)) | None => {}
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for TvlcomCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.id, &item.payload, dst)
    }
}
