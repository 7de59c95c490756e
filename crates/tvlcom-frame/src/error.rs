use tvlcom_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared data length exceeds the protocol maximum.
    #[error("data length too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The received CRC does not match the one computed over the frame.
    #[error("crc mismatch (computed 0x{expected:04X}, received 0x{received:04X})")]
    ChecksumMismatch { expected: u16, received: u16 },

    /// A tail byte did not match.
    #[error("bad tail (expected 0x{expected:02X}, found 0x{found:02X})")]
    BadTrailer { expected: u8, found: u8 },

    /// A TLV record runs past the end of the data region.
    #[error("malformed TLV at offset {offset}: needs {needed} bytes, {available} available")]
    MalformedTlv {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A TLV value does not fit in one length byte.
    #[error("TLV value too large ({size} bytes, max {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// A frame payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transport accepted fewer bytes than the frame holds.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The link closed before another frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for the stream errors the receiver recovers from by resynchronizing.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            FrameError::FrameTooLarge { .. }
                | FrameError::ChecksumMismatch { .. }
                | FrameError::BadTrailer { .. }
                | FrameError::MalformedTlv { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
