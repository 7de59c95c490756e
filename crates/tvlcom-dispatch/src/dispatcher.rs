use std::sync::Arc;

use tracing::{debug, trace};
use tvlcom_frame::{build_frame, build_reply, AckKind, FrameError, ReceivedFrame, TlvRecord};
use tvlcom_transport::Transport;

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::handler::{AckObserver, CommandHandler, ValueHandler};
use crate::registry::{HandlerRegistry, Registration, RouteKey};

/// Why one record of a frame could not be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteFailure {
    /// No value handler for this type.
    #[error("no handler for TLV type 0x{tlv_type:02X}")]
    UnknownType { tlv_type: u8 },

    /// No handler for this control command.
    #[error("no handler for command 0x{command:02X}")]
    UnknownCommand { command: u8 },

    /// A control record with an empty value.
    #[error("control record without a command byte")]
    MissingCommand,

    /// The handler returned false.
    #[error("handler for {key:?} reported failure")]
    HandlerFailed { key: RouteKey },
}

/// Result of routing one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every record was handled.
    Ack,
    /// At least one record was not handled.
    Nack { failures: Vec<RouteFailure> },
    /// The frame only carried ACK/NACK records; nothing is sent back.
    Silent,
}

impl DispatchOutcome {
    /// The reply this outcome calls for.
    pub fn reply_kind(&self) -> Option<AckKind> {
        match self {
            DispatchOutcome::Ack => Some(AckKind::Ack),
            DispatchOutcome::Nack { .. } => Some(AckKind::Nack),
            DispatchOutcome::Silent => None,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, DispatchOutcome::Ack)
    }
}

/// Routes received frames to handlers and answers with ACK/NACK.
///
/// Routing:
/// - control records go to the command handler named by their first value byte
/// - ACK/NACK records go to the optional [`AckObserver`] only
/// - every other record goes to the value handler for its type
///
/// A missing handler or a handler returning false degrades the frame to a
/// NACK. Later records in the same frame are still routed.
pub struct Dispatcher<T> {
    transport: T,
    registry: HandlerRegistry,
    config: DispatcherConfig,
    observer: Option<Arc<dyn AckObserver>>,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher with default configuration and an empty registry.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, DispatcherConfig::default())
    }

    /// Create a dispatcher with explicit configuration and an empty registry.
    pub fn with_config(transport: T, config: DispatcherConfig) -> Self {
        Self {
            transport,
            registry: HandlerRegistry::new(config.types),
            config,
            observer: None,
        }
    }

    /// Create a dispatcher around a registry populated elsewhere.
    ///
    /// Fails with [`DispatchError::TypeSetMismatch`] if the registry was built
    /// for a different reserved type set.
    pub fn with_registry(
        transport: T,
        registry: HandlerRegistry,
        config: DispatcherConfig,
    ) -> Result<Self> {
        if *registry.types() != config.types {
            return Err(DispatchError::TypeSetMismatch);
        }
        Ok(Self {
            transport,
            registry,
            config,
            observer: None,
        })
    }

    /// Bind a value handler. See [`HandlerRegistry::register_value`].
    pub fn register_value<H>(&mut self, tlv_type: u8, handler: H) -> Result<Registration>
    where
        H: ValueHandler + 'static,
    {
        self.registry.register_value(tlv_type, handler)
    }

    /// Bind a command handler. See [`HandlerRegistry::register_command`].
    pub fn register_command<H>(&mut self, command: u8, handler: H) -> Registration
    where
        H: CommandHandler + 'static,
    {
        self.registry.register_command(command, handler)
    }

    pub fn unregister(&mut self, registration: Registration) -> bool {
        self.registry.unregister(registration)
    }

    /// Install the ACK/NACK observer, replacing any previous one.
    pub fn set_ack_observer<O>(&mut self, observer: O)
    where
        O: AckObserver + 'static,
    {
        self.observer = Some(Arc::new(observer));
    }

    /// Route every record of `frame` without sending anything.
    pub fn dispatch(&self, frame: &ReceivedFrame) -> DispatchOutcome {
        let types = &self.config.types;

        if frame.is_ack_only(types) {
            for record in &frame.records {
                if let Some(kind) = types.ack_kind(record.tlv_type) {
                    self.notify(kind, record);
                }
            }
            trace!(frame_id = frame.id, "acknowledgement-only frame");
            return DispatchOutcome::Silent;
        }

        let mut failures = Vec::new();
        for record in &frame.records {
            if let Some(kind) = types.ack_kind(record.tlv_type) {
                self.notify(kind, record);
                continue;
            }
            if let Err(failure) = self.route(record) {
                debug!(frame_id = frame.id, %failure, "record not handled");
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            DispatchOutcome::Ack
        } else {
            DispatchOutcome::Nack { failures }
        }
    }

    /// Route `frame` and send the reply its outcome calls for.
    ///
    /// Replies echo `frame.id` in their value and are framed with
    /// [`DispatcherConfig::reply_frame_id`].
    pub fn on_frame(&self, frame: &ReceivedFrame) -> Result<DispatchOutcome> {
        let outcome = self.dispatch(frame);
        if !self.config.auto_reply {
            return Ok(outcome);
        }
        if let Some(kind) = outcome.reply_kind() {
            let reply = build_reply(
                kind,
                &self.config.types,
                frame.id,
                self.config.reply_frame_id,
            );
            self.send_all(&reply)?;
            trace!(frame_id = frame.id, ?kind, "reply sent");
        }
        Ok(outcome)
    }

    /// Build a frame and send it over the dispatcher's transport.
    pub fn send(&self, frame_id: u8, payload: &[u8]) -> Result<usize> {
        let frame = build_frame(frame_id, payload)?;
        self.send_all(&frame)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consume the dispatcher and return the inner transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn route(&self, record: &TlvRecord) -> std::result::Result<(), RouteFailure> {
        if record.tlv_type == self.config.types.control {
            let command = record.as_command().ok_or(RouteFailure::MissingCommand)?;
            let handler = self
                .registry
                .command_handler(command)
                .ok_or(RouteFailure::UnknownCommand { command })?;
            return if handler.handle() {
                Ok(())
            } else {
                Err(RouteFailure::HandlerFailed {
                    key: RouteKey::Command(command),
                })
            };
        }

        let tlv_type = record.tlv_type;
        let handler = self
            .registry
            .value_handler(tlv_type)
            .ok_or(RouteFailure::UnknownType { tlv_type })?;
        if handler.handle(&record.value) {
            Ok(())
        } else {
            Err(RouteFailure::HandlerFailed {
                key: RouteKey::Value(tlv_type),
            })
        }
    }

    fn notify(&self, kind: AckKind, record: &TlvRecord) {
        if let Some(observer) = &self.observer {
            observer.observe(kind, record.as_command());
        }
    }

    fn send_all(&self, frame: &[u8]) -> Result<usize> {
        let written = self.transport.send(frame)?;
        if written != frame.len() {
            return Err(FrameError::ShortWrite {
                written,
                expected: frame.len(),
            }
            .into());
        }
        Ok(written)
    }
}

impl<T> std::fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
