use tvlcom_frame::TlvTypes;

/// Controls routing and reply behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Reserved type set used to classify records and build replies.
    pub types: TlvTypes,
    /// Frame id carried by ACK/NACK replies. Default: 0.
    pub reply_frame_id: u8,
    /// When false, `on_frame` routes but never sends a reply.
    pub auto_reply: bool,
}

impl DispatcherConfig {
    /// Default configuration for a given type set.
    pub fn with_types(types: TlvTypes) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            types: TlvTypes::default(),
            reply_frame_id: 0,
            auto_reply: true,
        }
    }
}
