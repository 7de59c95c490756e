//! Routing of received TVLCOM frames to application handlers.
//!
//! A [`Dispatcher`] owns one [`HandlerRegistry`] and one transport. For each
//! frame it routes every record, then answers with an ACK when all records
//! were handled, a NACK when any was not, and nothing when the frame only
//! carried acknowledgements.
//!
//! [`Link`] couples a [`FrameReader`](tvlcom_frame::FrameReader) with a
//! dispatcher over the same transport.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod link;
pub mod registry;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher, RouteFailure};
pub use error::{DispatchError, Result};
pub use handler::{AckObserver, CommandHandler, ValueHandler};
pub use link::{Dispatched, Link};
pub use registry::{HandlerRegistry, Registration, RouteKey};
