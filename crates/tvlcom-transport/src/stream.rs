use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Transport over any `Read`/`Write` pair.
///
/// Reader and writer sit behind separate locks, so one thread can block in
/// `read` while others `send`. Read timeouts and `WouldBlock` surface as empty
/// reads; `Interrupted` is retried.
pub struct StreamTransport<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
    closed: AtomicBool,
}

impl<R, W> StreamTransport<R, W>
where
    R: Read + Send,
    W: Write + Send,
{
    /// Wrap an already-open reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    /// Consume the transport and return the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (
            self.reader
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            self.writer
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }
        Ok(())
    }
}

#[cfg(unix)]
impl StreamTransport<std::os::unix::net::UnixStream, std::os::unix::net::UnixStream> {
    /// Split a connected Unix socket into a transport.
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self::new(stream, writer))
    }
}

impl<R, W> Transport for StreamTransport<R, W>
where
    R: Read + Send,
    W: Write + Send,
{
    fn send(&self, data: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut offset = 0usize;
        while offset < data.len() {
            match writer.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match writer.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        Ok(offset)
    }

    fn read(&self, max: usize) -> Result<Bytes> {
        self.ensure_open()?;
        if max == 0 {
            return Ok(Bytes::new());
        }

        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let mut buf = vec![0u8; max];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Bytes::from(buf));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(Bytes::new());
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush()?;
        debug!("stream transport closed");
        Ok(())
    }
}

impl<R, W> std::fmt::Debug for StreamTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn send_writes_whole_buffer() {
        let transport = StreamTransport::new(Cursor::new(Vec::new()), Vec::new());
        let written = transport.send(b"\xF0\x0Fhello").unwrap();
        assert_eq!(written, 7);

        let (_, sink) = transport.into_inner();
        assert_eq!(sink, b"\xF0\x0Fhello");
    }

    #[test]
    fn read_returns_available_bytes() {
        let transport = StreamTransport::new(Cursor::new(vec![1, 2, 3, 4, 5]), Vec::new());
        assert_eq!(transport.read(3).unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(transport.read(8).unwrap().as_ref(), &[4, 5]);
    }

    #[test]
    fn end_of_stream_is_connection_closed() {
        let transport = StreamTransport::new(Cursor::new(Vec::new()), Vec::new());
        let err = transport.read(16).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn zero_max_reads_nothing() {
        let transport = StreamTransport::new(Cursor::new(vec![9]), Vec::new());
        assert!(transport.read(0).unwrap().is_empty());
        assert_eq!(transport.read(1).unwrap().as_ref(), &[9]);
    }

    #[test]
    fn would_block_is_an_empty_read() {
        let transport = StreamTransport::new(WouldBlockThenData { blocked: false }, Vec::new());
        assert!(transport.read(4).unwrap().is_empty());
        assert_eq!(transport.read(4).unwrap().as_ref(), &[0xAA]);
    }

    #[test]
    fn interrupted_write_is_retried() {
        let sink = InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        };
        let transport = StreamTransport::new(Cursor::new(Vec::new()), sink);
        assert_eq!(transport.send(b"abc").unwrap(), 3);

        let (_, sink) = transport.into_inner();
        assert_eq!(sink.data, b"abc");
    }

    #[test]
    fn zero_length_write_reports_closed() {
        let transport = StreamTransport::new(Cursor::new(Vec::new()), ZeroWriter);
        let err = transport.send(b"x").unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn closed_transport_rejects_io() {
        let transport = StreamTransport::new(Cursor::new(vec![1]), Vec::new());
        transport.close().unwrap();
        transport.close().unwrap();

        assert!(matches!(transport.send(b"x"), Err(TransportError::Shutdown)));
        assert!(matches!(transport.read(1), Err(TransportError::Shutdown)));
    }

    #[test]
    #[cfg(unix)]
    fn unix_pair_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let left = StreamTransport::from_unix(left).unwrap();
        let right = StreamTransport::from_unix(right).unwrap();

        left.send(b"ping").unwrap();
        let mut got = Vec::new();
        while got.len() < 4 {
            got.extend_from_slice(&right.read(16).unwrap());
        }
        assert_eq!(got, b"ping");
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_sends_do_not_interleave() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let sender = Arc::new(StreamTransport::from_unix(left).unwrap());
        let receiver = StreamTransport::from_unix(right).unwrap();

        let threads: Vec<_> = (0..4u8)
            .map(|i| {
                let sender = Arc::clone(&sender);
                std::thread::spawn(move || {
                    for _ in 0..16 {
                        sender.send(&[i; 8]).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let mut got = Vec::new();
        while got.len() < 4 * 16 * 8 {
            got.extend_from_slice(&receiver.read(512).unwrap());
        }
        for chunk in got.chunks(8) {
            assert!(chunk.iter().all(|b| *b == chunk[0]));
        }
    }

    struct WouldBlockThenData {
        blocked: bool,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.blocked {
                self.blocked = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            buf[0] = 0xAA;
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
