use std::collections::VecDeque;

use tracing::debug;
use tvlcom_transport::{Transport, TransportError};

use crate::codec::{FrameConfig, ReceivedFrame};
use crate::error::{FrameError, Result};
use crate::receiver::{FrameReceiver, ReceiverStats};

type ErrorHook = Box<dyn FnMut(&FrameError) + Send>;

/// Pulls bytes from a [`Transport`] and yields complete frames.
///
/// Corrupted frames are dropped by the receiver and never surface as errors
/// here; install [`on_stream_error`](Self::on_stream_error) to observe them.
pub struct FrameReader<T> {
    inner: T,
    receiver: FrameReceiver,
    pending: VecDeque<ReceivedFrame>,
    config: FrameConfig,
    on_error: Option<ErrorHook>,
}

impl<T: Transport> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            receiver: FrameReceiver::new(),
            pending: VecDeque::new(),
            config,
            on_error: None,
        }
    }

    /// Install a callback for frames dropped by the receiver.
    pub fn on_stream_error<F>(&mut self, hook: F)
    where
        F: FnMut(&FrameError) + Send + 'static,
    {
        self.on_error = Some(Box::new(hook));
    }

    /// Read once from the transport and parse what arrived.
    ///
    /// Returns the number of bytes consumed; zero means the transport had
    /// nothing available. Completed frames are queued for [`next_frame`](Self::next_frame).
    pub fn poll(&mut self) -> Result<usize> {
        let chunk = self
            .inner
            .read(self.config.read_chunk_size)
            .map_err(transport_to_frame_error)?;

        let pending = &mut self.pending;
        let on_error = &mut self.on_error;
        self.receiver.feed(&chunk, |event| match event {
            Ok(frame) => pending.push_back(frame),
            Err(err) => {
                if let Some(hook) = on_error.as_mut() {
                    hook(&err);
                }
            }
        });

        Ok(chunk.len())
    }

    /// Pop a frame completed by an earlier [`poll`](Self::poll).
    pub fn next_frame(&mut self) -> Option<ReceivedFrame> {
        self.pending.pop_front()
    }

    /// Read once and return every frame that is now complete.
    pub fn poll_frames(&mut self) -> Result<Vec<ReceivedFrame>> {
        self.poll()?;
        Ok(self.pending.drain(..).collect())
    }

    /// Read the next complete frame (blocking).
    ///
    /// Sleeps for the configured idle backoff whenever the transport has
    /// nothing to offer. Returns `Err(FrameError::ConnectionClosed)` at end of stream.
    pub fn read_frame(&mut self) -> Result<ReceivedFrame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            if self.poll()? == 0 {
                std::thread::sleep(self.config.idle_backoff);
            }
        }
    }

    /// Receiver counters.
    pub fn stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::ConnectionClosed => {
            debug!("transport reached end of stream");
            FrameError::ConnectionClosed
        }
        other => FrameError::Transport(other),
    }
}
