use tvlcom_frame::FrameError;
use tvlcom_transport::TransportError;

/// Errors that can occur while registering handlers or replying to frames.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Value handlers cannot be bound to control, ACK, or NACK types.
    #[error("TLV type 0x{0:02X} is routed by the dispatcher itself")]
    ReservedType(u8),

    /// The registry and the dispatcher disagree on the reserved type set.
    #[error("registry type set does not match dispatcher configuration")]
    TypeSetMismatch,

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// True when the link reached end of stream.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            DispatchError::Frame(FrameError::ConnectionClosed)
                | DispatchError::Transport(TransportError::ConnectionClosed)
                | DispatchError::Frame(FrameError::Transport(TransportError::ConnectionClosed))
        )
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
