//! Handler contracts.
//!
//! Closures work directly: `|value: &[u8]| -> bool` is a [`ValueHandler`],
//! `|| -> bool` is a [`CommandHandler`]. Returning `false` turns the frame's
//! reply into a NACK.

use tvlcom_frame::AckKind;

/// Handles the value of a record routed by its TLV type.
pub trait ValueHandler: Send + Sync {
    fn handle(&self, value: &[u8]) -> bool;
}

impl<F> ValueHandler for F
where
    F: Fn(&[u8]) -> bool + Send + Sync,
{
    fn handle(&self, value: &[u8]) -> bool {
        self(value)
    }
}

/// Handles a control command routed by its command byte.
pub trait CommandHandler: Send + Sync {
    fn handle(&self) -> bool;
}

impl<F> CommandHandler for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn handle(&self) -> bool {
        self()
    }
}

/// Sees every ACK/NACK record received.
///
/// `acked_id` is the first value byte, if any. Observers never influence the
/// dispatch outcome; they exist so applications can track their own sends.
pub trait AckObserver: Send + Sync {
    fn observe(&self, kind: AckKind, acked_id: Option<u8>);
}

impl<F> AckObserver for F
where
    F: Fn(AckKind, Option<u8>) + Send + Sync,
{
    fn observe(&self, kind: AckKind, acked_id: Option<u8>) {
        self(kind, acked_id)
    }
}
