use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// A bidirectional byte link.
///
/// `send` may be called concurrently from any thread: dispatcher replies,
/// application handlers, and periodic senders all share one link. `read` is
/// expected to be driven by a single reader thread per link.
pub trait Transport: Send + Sync {
    /// Write the whole buffer, returning the number of bytes written.
    fn send(&self, data: &[u8]) -> Result<usize>;

    /// Read up to `max` bytes.
    ///
    /// An empty buffer means no data is available right now. End of stream is
    /// reported as [`TransportError::ConnectionClosed`](crate::TransportError::ConnectionClosed).
    fn read(&self, max: usize) -> Result<Bytes>;

    /// Close the link and release resources.
    fn close(&self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn read(&self, max: usize) -> Result<Bytes> {
        (**self).read(max)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn read(&self, max: usize) -> Result<Bytes> {
        (**self).read(max)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn read(&self, max: usize) -> Result<Bytes> {
        (**self).read(max)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
