use serde::Serialize;

/// Counters for everything a receiver observed while processing buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    /// Struct messages decoded in full.
    pub messages: u64,
    /// Decoded struct messages with no handler installed.
    pub unhandled: u64,
    pub unknown_identifier: u64,
    /// Identifiers or struct bodies cut short by the end of the buffer.
    pub truncated: u64,
    /// Non-struct messages passed to the non-struct handler.
    pub non_struct: u64,
    pub non_struct_failed: u64,
    pub non_struct_unhandled: u64,
    /// Buffers dropped because no schema was registered.
    pub unconfigured: u64,
    /// Bytes left unread when a buffer was abandoned.
    pub abandoned_bytes: u64,
}

impl ReceiverStats {
    /// Number of observations that caused a buffer to be abandoned.
    pub fn errors(&self) -> u64 {
        self.unknown_identifier
            + self.truncated
            + self.non_struct_failed
            + self.non_struct_unhandled
            + self.unconfigured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_excludes_successful_observations() {
        let stats = ReceiverStats {
            messages: 4,
            unhandled: 2,
            non_struct: 1,
            truncated: 1,
            unknown_identifier: 1,
            ..ReceiverStats::default()
        };
        assert_eq!(stats.errors(), 2);
    }

    #[test]
    fn serializes_with_field_names() {
        let json = serde_json::to_value(ReceiverStats::default()).unwrap();
        assert_eq!(json["abandoned_bytes"], 0);
        assert_eq!(json["non_struct_failed"], 0);
    }
}
