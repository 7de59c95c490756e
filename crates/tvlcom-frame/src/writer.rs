use bytes::BytesMut;
use tracing::trace;
use tvlcom_transport::Transport;

use crate::codec::{build_reply, encode_frame, Frame, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::types::{AckKind, TlvTypes};

/// Writes complete frames to a [`Transport`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    types: TlvTypes,
}

impl<T: Transport> FrameWriter<T> {
    /// Create a new frame writer using the host type set for replies.
    pub fn new(inner: T) -> Self {
        Self::with_types(inner, TlvTypes::default())
    }

    /// Create a new frame writer with an explicit reserved type set.
    pub fn with_types(inner: T, types: TlvTypes) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            types,
        }
    }

    /// Write a complete frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.send(frame.id, frame.payload.as_ref())
    }

    /// Encode and send a payload with the given frame id.
    ///
    /// Returns the number of bytes put on the wire.
    pub fn send(&mut self, frame_id: u8, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(frame_id, payload, &mut self.buf)?;
        let expected = self.buf.len();
        let written = self.inner.send(&self.buf)?;
        if written != expected {
            return Err(FrameError::ShortWrite { written, expected });
        }
        trace!(frame_id, len = payload.len(), "frame sent");
        Ok(written)
    }

    /// Send an ACK or NACK for `acked_id`.
    pub fn send_reply(&mut self, kind: AckKind, acked_id: u8, reply_id: u8) -> Result<usize> {
        let frame = build_reply(kind, &self.types, acked_id, reply_id);
        let written = self.inner.send(&frame)?;
        if written != frame.len() {
            return Err(FrameError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        Ok(written)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Reserved type set used for replies.
    pub fn types(&self) -> &TlvTypes {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tvlcom_transport::{MemoryTransport, TransportError};

    use super::*;
    use crate::codec::{build_frame, MAX_DATA_LENGTH, OVERHEAD};
    use crate::receiver::FrameReceiver;

    struct HalfTransport;

    impl Transport for HalfTransport {
        fn send(&self, data: &[u8]) -> tvlcom_transport::Result<usize> {
            Ok(data.len() / 2)
        }

        fn read(&self, _max: usize) -> tvlcom_transport::Result<Bytes> {
            Ok(Bytes::new())
        }

        fn close(&self) -> tvlcom_transport::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_writes_one_frame() {
        let mut writer = FrameWriter::new(MemoryTransport::new());
        let payload = [0x40, 0x02, 0x01, 0x02];
        let n = writer.send(7, &payload).unwrap();
        assert_eq!(n, OVERHEAD + payload.len());

        let sent = writer.get_ref().take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], build_frame(7, &payload).unwrap());
    }

    #[test]
    fn write_frame_matches_send() {
        let mut writer = FrameWriter::new(MemoryTransport::new());
        let frame = Frame::new(3, Bytes::from_static(&[0x41, 0x01, 0x09]));
        writer.write_frame(&frame).unwrap();

        let sent = writer.get_ref().take_sent();
        let mut receiver = FrameReceiver::new();
        let frames = receiver.feed_frames(&sent[0]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 3);
        assert_eq!(frames[0].records[0].tlv_type, 0x41);
    }

    #[test]
    fn oversized_payload_sends_nothing() {
        let mut writer = FrameWriter::new(MemoryTransport::new());
        let err = writer.send(1, &vec![0u8; MAX_DATA_LENGTH + 1]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().sent().is_empty());
    }

    #[test]
    fn short_write_is_reported() {
        let mut writer = FrameWriter::new(HalfTransport);
        let err = writer.send(1, &[0x40, 0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortWrite {
                written: 5,
                expected: 11
            }
        ));
    }

    #[test]
    fn replies_use_configured_types() {
        let mut writer = FrameWriter::with_types(MemoryTransport::new(), TlvTypes::FIRMWARE);
        writer.send_reply(AckKind::Nack, 0x12, 0).unwrap();

        let sent = writer.get_ref().take_sent();
        assert_eq!(&sent[0][2..7], &[0x00, 0x03, 0x15, 0x01, 0x12]);
        assert_eq!(writer.types().ack, 0x06);
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = MemoryTransport::new();
        transport.close().unwrap();
        let mut writer = FrameWriter::new(transport);
        let err = writer.send(1, &[]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Shutdown)
        ));
    }
}
