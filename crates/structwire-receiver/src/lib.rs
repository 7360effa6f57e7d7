//! Decode and dispatch identifier-framed struct messages.
//!
//! A buffer handed to [`StructReceiver::process`] holds one or more
//! messages laid out back to back:
//! - An identifier, encoded with the receiver's identifier kind and byte order
//! - The struct body for that identifier, fixed size, no length prefix
//!
//! Identifier `0` is reserved for opaque non-struct payloads. Because no
//! message carries its own length, anything the receiver cannot decode
//! ends processing of the buffer.

pub mod error;
pub mod receiver;
pub mod stats;

pub use error::{HandlerSlot, ReceiverError, Result};
pub use receiver::{
    AbandonReason, Disposition, Framing, NonStructHandler, StructHandler, StructReceiver,
    NON_STRUCT_ID,
};
pub use stats::ReceiverStats;
