use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

type Queue = Arc<Mutex<BytesMut>>;

/// In-process transport.
///
/// A standalone instance records every sent buffer and reads from an inbound
/// queue filled with [`push_inbound`](Self::push_inbound). Two instances created
/// by [`pair`](Self::pair) are cross-wired: what one sends, the other reads.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Queue,
    outbound: Option<Queue>,
    sent: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Create a standalone transport.
    pub fn new() -> Self {
        Self {
            inbound: Arc::default(),
            outbound: None,
            sent: Mutex::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Create two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Queue = Arc::default();
        let b_to_a: Queue = Arc::default();
        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Some(Arc::clone(&a_to_b)),
            ..Self::new()
        };
        let b = Self {
            inbound: a_to_b,
            outbound: Some(b_to_a),
            ..Self::new()
        };
        (a, b)
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn push_inbound(&self, data: &[u8]) {
        lock(&self.inbound).extend_from_slice(data);
    }

    /// Number of inbound bytes not yet read.
    pub fn pending_inbound(&self) -> usize {
        lock(&self.inbound).len()
    }

    /// Snapshot of every buffer sent so far.
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain and return every buffer sent so far.
    pub fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, data: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }
        if let Some(outbound) = &self.outbound {
            lock(outbound).extend_from_slice(data);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Bytes::copy_from_slice(data));
        trace!(len = data.len(), "memory transport send");
        Ok(data.len())
    }

    fn read(&self, max: usize) -> Result<Bytes> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }
        let mut inbound = lock(&self.inbound);
        let n = max.min(inbound.len());
        Ok(inbound.split_to(n).freeze())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn lock(queue: &Queue) -> std::sync::MutexGuard<'_, BytesMut> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sent_buffers() {
        let transport = MemoryTransport::new();
        transport.send(b"one").unwrap();
        transport.send(b"two").unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].as_ref(), b"one");
        assert_eq!(sent[1].as_ref(), b"two");

        assert_eq!(transport.take_sent().len(), 2);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn reads_inbound_in_chunks() {
        let transport = MemoryTransport::new();
        transport.push_inbound(&[1, 2, 3, 4]);

        assert_eq!(transport.read(3).unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(transport.pending_inbound(), 1);
        assert_eq!(transport.read(3).unwrap().as_ref(), &[4]);
        assert!(transport.read(3).unwrap().is_empty());
    }

    #[test]
    fn pair_is_cross_wired() {
        let (a, b) = MemoryTransport::pair();
        a.send(b"to-b").unwrap();
        b.send(b"to-a").unwrap();

        assert_eq!(b.read(16).unwrap().as_ref(), b"to-b");
        assert_eq!(a.read(16).unwrap().as_ref(), b"to-a");
    }

    #[test]
    fn standalone_send_does_not_loop_back() {
        let transport = MemoryTransport::new();
        transport.send(b"x").unwrap();
        assert!(transport.read(16).unwrap().is_empty());
    }

    #[test]
    fn close_rejects_further_io() {
        let transport = MemoryTransport::new();
        transport.close().unwrap();
        assert!(transport.is_closed());
        assert!(matches!(transport.send(b"x"), Err(TransportError::Shutdown)));
        assert!(matches!(transport.read(1), Err(TransportError::Shutdown)));
    }
}
