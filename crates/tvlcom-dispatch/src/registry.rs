use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tvlcom_frame::TlvTypes;

use crate::error::{DispatchError, Result};
use crate::handler::{CommandHandler, ValueHandler};

/// What a handler is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKey {
    /// Records of this TLV type.
    Value(u8),
    /// Control records whose first value byte is this command.
    Command(u8),
}

/// Capability handle returned by registration.
///
/// Passing it to [`HandlerRegistry::unregister`] removes the handler, unless
/// a later registration has already replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    key: RouteKey,
    generation: u64,
}

impl Registration {
    pub fn key(&self) -> RouteKey {
        self.key
    }
}

struct Entry<H: ?Sized> {
    generation: u64,
    handler: Arc<H>,
}

/// Byte-keyed handler tables for one dispatcher.
pub struct HandlerRegistry {
    types: TlvTypes,
    values: HashMap<u8, Entry<dyn ValueHandler>>,
    commands: HashMap<u8, Entry<dyn CommandHandler>>,
    next_generation: u64,
}

impl HandlerRegistry {
    /// Create an empty registry for a reserved type set.
    pub fn new(types: TlvTypes) -> Self {
        Self {
            types,
            values: HashMap::new(),
            commands: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Bind a handler to a TLV type. Replaces any previous handler for it.
    ///
    /// Control, ACK, and NACK types are rejected with [`DispatchError::ReservedType`];
    /// the integer and string types are ordinary value routes.
    pub fn register_value<H>(&mut self, tlv_type: u8, handler: H) -> Result<Registration>
    where
        H: ValueHandler + 'static,
    {
        if self.types.is_routing_reserved(tlv_type) {
            return Err(DispatchError::ReservedType(tlv_type));
        }
        let generation = self.bump();
        let previous = self.values.insert(
            tlv_type,
            Entry {
                generation,
                handler: Arc::new(handler),
            },
        );
        debug!(
            tlv_type,
            replaced = previous.is_some(),
            "value handler registered"
        );
        Ok(Registration {
            key: RouteKey::Value(tlv_type),
            generation,
        })
    }

    /// Bind a handler to a control command byte. Replaces any previous handler for it.
    pub fn register_command<H>(&mut self, command: u8, handler: H) -> Registration
    where
        H: CommandHandler + 'static,
    {
        let generation = self.bump();
        let previous = self.commands.insert(
            command,
            Entry {
                generation,
                handler: Arc::new(handler),
            },
        );
        debug!(
            command,
            replaced = previous.is_some(),
            "command handler registered"
        );
        Registration {
            key: RouteKey::Command(command),
            generation,
        }
    }

    /// Remove the handler a registration refers to.
    ///
    /// Returns false if it was already removed or replaced.
    pub fn unregister(&mut self, registration: Registration) -> bool {
        let removed = match registration.key {
            RouteKey::Value(tlv_type) => {
                remove_if_current(&mut self.values, tlv_type, registration.generation)
            }
            RouteKey::Command(command) => {
                remove_if_current(&mut self.commands, command, registration.generation)
            }
        };
        if removed {
            debug!(key = ?registration.key, "handler unregistered");
        }
        removed
    }

    /// Handler for a TLV type.
    pub fn value_handler(&self, tlv_type: u8) -> Option<Arc<dyn ValueHandler>> {
        self.values.get(&tlv_type).map(|entry| Arc::clone(&entry.handler))
    }

    /// Handler for a command byte.
    pub fn command_handler(&self, command: u8) -> Option<Arc<dyn CommandHandler>> {
        self.commands
            .get(&command)
            .map(|entry| Arc::clone(&entry.handler))
    }

    /// Whether anything is bound to `key`.
    pub fn contains(&self, key: RouteKey) -> bool {
        match key {
            RouteKey::Value(tlv_type) => self.values.contains_key(&tlv_type),
            RouteKey::Command(command) => self.commands.contains_key(&command),
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.values.len() + self.commands.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserved type set this registry validates against.
    pub fn types(&self) -> &TlvTypes {
        &self.types
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(TlvTypes::default())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut values: Vec<_> = self.values.keys().copied().collect();
        let mut commands: Vec<_> = self.commands.keys().copied().collect();
        values.sort_unstable();
        commands.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types)
            .field("values", &values)
            .field("commands", &commands)
            .finish()
    }
}

fn remove_if_current<H: ?Sized>(
    map: &mut HashMap<u8, Entry<H>>,
    key: u8,
    generation: u64,
) -> bool {
    match map.get(&key) {
        Some(entry) if entry.generation == generation => {
            map.remove(&key);
            true
        }
        _ => false,
    }
}
