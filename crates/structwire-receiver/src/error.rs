use std::fmt;

use crate::receiver::Framing;

/// Which handler a registration conflicts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSlot {
    Struct(u64),
    NonStruct,
}

impl fmt::Display for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSlot::Struct(id) => write!(f, "identifier {id}"),
            HandlerSlot::NonStruct => f.write_str("non-struct messages"),
        }
    }
}

/// Errors returned while configuring a receiver.
///
/// Problems found while processing a buffer are observations recorded in
/// [`crate::ReceiverStats`], never errors.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Schema-level error.
    #[error("protocol error: {0}")]
    Protocol(#[from] structwire_protocol::ProtocolError),

    /// The schema's framing differs from the one already established.
    #[error("protocol '{name}' is framed as {found} but the receiver uses {expected}")]
    SchemaMismatch {
        name: String,
        expected: Framing,
        found: Framing,
    },

    /// Another schema already claims this identifier.
    #[error("identifier {id} is already registered to '{existing}'")]
    DuplicateIdentifier { id: u64, existing: String },

    /// A handler is already installed for this slot.
    #[error("a handler is already registered for {0}")]
    DuplicateHandler(HandlerSlot),

    /// Identifier `0` is reserved for non-struct messages.
    #[error("identifier 0 is reserved for non-struct messages")]
    ReservedIdentifier,
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
