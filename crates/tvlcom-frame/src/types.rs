//! Reserved TLV types.
//!
//! The byte values of the engine's own record types are a deployment choice:
//! the host library and the embedded firmware historically use different sets.
//! Application-defined types occupy every other value.

/// The reserved TLV type set used by one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TlvTypes {
    /// Single-byte control command.
    pub control: u8,
    /// Little-endian 32-bit integer.
    pub integer: u8,
    /// UTF-8 text.
    pub string: u8,
    /// Positive acknowledgement carrying the acknowledged frame id.
    pub ack: u8,
    /// Negative acknowledgement carrying the rejected frame id.
    pub nack: u8,
}

impl TlvTypes {
    /// Host-side type set.
    pub const HOST: Self = Self {
        control: 0x01,
        integer: 0x02,
        string: 0x03,
        ack: 0x08,
        nack: 0x09,
    };

    /// Embedded-firmware type set.
    pub const FIRMWARE: Self = Self {
        control: 0x10,
        integer: 0x20,
        string: 0x30,
        ack: 0x06,
        nack: 0x15,
    };

    /// Returns true for ACK or NACK records.
    pub fn is_ack_or_nack(&self, tlv_type: u8) -> bool {
        tlv_type == self.ack || tlv_type == self.nack
    }

    /// Returns true for types the dispatcher routes itself (control, ACK, NACK).
    pub fn is_routing_reserved(&self, tlv_type: u8) -> bool {
        tlv_type == self.control || self.is_ack_or_nack(tlv_type)
    }

    /// Which acknowledgement, if any, a record type denotes.
    pub fn ack_kind(&self, tlv_type: u8) -> Option<AckKind> {
        if tlv_type == self.ack {
            Some(AckKind::Ack)
        } else if tlv_type == self.nack {
            Some(AckKind::Nack)
        } else {
            None
        }
    }

    /// TLV type byte for an acknowledgement kind.
    pub fn ack_type(&self, kind: AckKind) -> u8 {
        match kind {
            AckKind::Ack => self.ack,
            AckKind::Nack => self.nack,
        }
    }

    /// Returns a human-readable name for a TLV type.
    pub fn type_name(&self, tlv_type: u8) -> &'static str {
        match tlv_type {
            t if t == self.control => "CONTROL",
            t if t == self.integer => "INTEGER",
            t if t == self.string => "STRING",
            t if t == self.ack => "ACK",
            t if t == self.nack => "NACK",
            _ => "USER",
        }
    }
}

impl Default for TlvTypes {
    fn default() -> Self {
        Self::HOST
    }
}

/// Acknowledgement polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    Ack,
    Nack,
}
