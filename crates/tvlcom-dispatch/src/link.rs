use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};
use tvlcom_frame::{FrameConfig, FrameError, FrameReader, ReceivedFrame};
use tvlcom_transport::Transport;

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::Result;

/// A frame together with what the dispatcher made of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub frame: ReceivedFrame,
    pub outcome: DispatchOutcome,
}

/// Reader and dispatcher sharing one transport.
///
/// `T` is typically `Arc<_>` or `&_` so both halves can hold a handle.
pub struct Link<T> {
    reader: FrameReader<T>,
    dispatcher: Dispatcher<T>,
}

impl<T: Transport + Clone> Link<T> {
    /// Create a link reading from the dispatcher's transport.
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self::with_config(dispatcher, FrameConfig::default())
    }

    /// Create a link with explicit reader configuration.
    pub fn with_config(dispatcher: Dispatcher<T>, config: FrameConfig) -> Self {
        let reader = FrameReader::with_config(dispatcher.transport().clone(), config);
        Self { reader, dispatcher }
    }
}

impl<T: Transport> Link<T> {
    /// Read once and dispatch every frame that completed.
    ///
    /// If a reply fails partway through, the error is returned and the frames
    /// already dispatched are lost to the caller; use [`Link::run`] to see them.
    pub fn poll(&mut self) -> Result<Vec<Dispatched>> {
        let mut dispatched = Vec::new();
        self.pump(&mut dispatched)?;
        Ok(dispatched)
    }

    /// Pump until `running` is cleared or the transport reaches end of stream.
    ///
    /// `on_dispatched` sees each frame after its reply was sent, including the
    /// frames dispatched before a failing reply. Returns the number of frames
    /// dispatched.
    pub fn run<F>(&mut self, running: &AtomicBool, mut on_dispatched: F) -> Result<u64>
    where
        F: FnMut(&Dispatched),
    {
        let mut count = 0u64;
        let mut dispatched = Vec::new();
        while running.load(Ordering::SeqCst) {
            let step = self.pump(&mut dispatched);
            for item in dispatched.drain(..) {
                on_dispatched(&item);
                count += 1;
            }
            let read = match step {
                Ok(read) => read,
                Err(err) if err.is_closed() => {
                    info!(frames = count, "link closed by peer");
                    return Ok(count);
                }
                Err(err) => {
                    warn!(frames = count, error = %err, "link stopped on error");
                    return Err(err);
                }
            };
            if read == 0 {
                std::thread::sleep(self.reader.config().idle_backoff);
            }
        }
        debug!(frames = count, "link stopped");
        Ok(count)
    }

    /// Install a callback for frames the receiver dropped.
    pub fn on_stream_error<F>(&mut self, hook: F)
    where
        F: FnMut(&FrameError) + Send + 'static,
    {
        self.reader.on_stream_error(hook);
    }

    pub fn reader(&self) -> &FrameReader<T> {
        &self.reader
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<T> {
        &mut self.dispatcher
    }

    /// Split the link back into its halves.
    pub fn into_parts(self) -> (FrameReader<T>, Dispatcher<T>) {
        (self.reader, self.dispatcher)
    }

    /// Read once and dispatch queued frames into `dispatched`, stopping at the
    /// first failed reply.
    fn pump(&mut self, dispatched: &mut Vec<Dispatched>) -> Result<usize> {
        let read = self.reader.poll()?;
        while let Some(frame) = self.reader.next_frame() {
            let outcome = self.dispatcher.on_frame(&frame)?;
            dispatched.push(Dispatched { frame, outcome });
        }
        Ok(read)
    }
}
