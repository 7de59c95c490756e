//! Byte-link abstraction for TVLCOM.
//!
//! The protocol engine never touches a serial port directly. It talks to a
//! [`Transport`], which only has to move bytes:
//! - `send` writes a complete buffer and must be safe to call from several threads
//! - `read` returns whatever bytes are available (possibly none)
//! - `close` releases the link
//!
//! [`StreamTransport`] adapts any `Read`/`Write` pair (files, Unix sockets);
//! [`DeviceTransport`] opens a path, treating terminals as serial lines.
//! [`MemoryTransport`] is an in-process link for tests and loopback.

pub mod device;
pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use device::{DeviceHandle, DeviceTransport, SerialConfig};
pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::StreamTransport;
pub use traits::Transport;
