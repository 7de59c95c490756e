//! Framed TLV messaging over serial-style byte links.
//!
//! tvlcom moves small typed records between a host and an embedded device
//! over links that drop and corrupt bytes. Frames carry a sync header, a
//! CRC16-CCITT, and a tail; the receiver resynchronizes after any error and
//! the dispatcher answers every handled frame with an ACK or NACK.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-link abstraction (device nodes, sockets, in-memory)
//! - [`frame`]: CRC, TLV records, frame codec, and the resynchronizing receiver
//! - [`dispatch`]: Handler registry, ACK/NACK reply policy, and the link pump

/// Re-export transport types.
pub mod transport {
    pub use tvlcom_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tvlcom_frame::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use tvlcom_dispatch::*;
}
