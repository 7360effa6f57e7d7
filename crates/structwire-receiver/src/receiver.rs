use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use serde::Serialize;
use structwire_primitives::{timestamp_now_ns, ByteOrder, PrimitiveKind};
use structwire_protocol::{Protocol, ProtocolFactory, Singletons};
use tracing::{debug, error, trace, warn};

use crate::error::{HandlerSlot, ReceiverError, Result};
use crate::stats::ReceiverStats;

/// Identifier reserved for opaque, non-struct payloads.
pub const NON_STRUCT_ID: u64 = 0;

/// Callback invoked with the decoded singleton of one struct type.
///
/// The protocol is overwritten by the next message of the same type;
/// take a [`Protocol::snapshot`] to keep the values.
pub type StructHandler = Box<dyn FnMut(&Protocol) + Send>;

/// Callback invoked with a cursor over everything after a non-struct
/// identifier. Returns `false` if the payload could not be parsed.
pub type NonStructHandler = Box<dyn FnMut(&mut &[u8]) -> bool + Send>;

/// How identifiers are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Framing {
    pub identifier_kind: PrimitiveKind,
    pub byte_order: ByteOrder,
}

impl Framing {
    fn of(protocol: &Protocol) -> Self {
        Self {
            identifier_kind: protocol.identifier_kind(),
            byte_order: protocol.byte_order(),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} identifiers, {} endian", self.identifier_kind, self.byte_order)
    }
}

/// Why the rest of a buffer was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    Unconfigured,
    Truncated,
    UnknownIdentifier,
    NonStructFailed,
    NonStructUnhandled,
}

/// How processing of one buffer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Every byte belonged to a decoded struct message.
    Consumed,
    /// A non-struct message was handled; it ends the buffer.
    NonStruct,
    /// The rest of the buffer was dropped after an error observation.
    Abandoned(AbandonReason),
}

impl Disposition {
    pub fn is_error(self) -> bool {
        matches!(self, Disposition::Abandoned(_))
    }
}

/// Decodes identifier-framed struct messages into shared singletons and
/// dispatches them to per-identifier handlers.
///
/// Configure the receiver first (`register*`, `add_*handler`), then feed
/// it buffers with [`StructReceiver::process`]. All registered schemas
/// must share the framing of the first one.
pub struct StructReceiver {
    framing: Option<Framing>,
    instances: BTreeMap<u64, Arc<Protocol>>,
    handlers: HashMap<u64, StructHandler>,
    non_struct_handler: Option<NonStructHandler>,
    singletons: Singletons,
    stats: ReceiverStats,
}

impl Default for StructReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StructReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructReceiver")
            .field("framing", &self.framing)
            .field("identifiers", &self.instances.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.len())
            .field("non_struct_handler", &self.non_struct_handler.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl StructReceiver {
    pub fn new() -> Self {
        Self {
            framing: None,
            instances: BTreeMap::new(),
            handlers: HashMap::new(),
            non_struct_handler: None,
            singletons: Singletons::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Register a schema and return its shared decode instance.
    pub fn register(&mut self, protocol: Protocol) -> Result<Arc<Protocol>> {
        let protocol = Arc::new(protocol);
        self.register_shared(Arc::clone(&protocol))?;
        Ok(protocol)
    }

    /// Register the singleton built by `F`, building it on first use.
    pub fn register_factory<F: ProtocolFactory>(&mut self) -> Result<Arc<Protocol>> {
        let protocol = self.singletons.singleton::<F>()?;
        self.register_shared(Arc::clone(&protocol))?;
        Ok(protocol)
    }

    /// Register an already shared schema instance.
    ///
    /// The first registration fixes the receiver's framing.
    pub fn register_shared(&mut self, protocol: Arc<Protocol>) -> Result<()> {
        let id = protocol.id();
        if id == NON_STRUCT_ID {
            return Err(ReceiverError::ReservedIdentifier);
        }
        protocol.check_identifier()?;

        let framing = Framing::of(&protocol);
        if let Some(expected) = self.framing {
            if expected != framing {
                return Err(ReceiverError::SchemaMismatch {
                    name: protocol.name().to_string(),
                    expected,
                    found: framing,
                });
            }
        }
        if let Some(existing) = self.instances.get(&id) {
            return Err(ReceiverError::DuplicateIdentifier {
                id,
                existing: existing.name().to_string(),
            });
        }

        debug!(
            name = protocol.name(),
            id,
            size = protocol.size(),
            framing = %framing,
            "registered struct protocol"
        );
        self.framing = Some(framing);
        self.instances.insert(id, protocol);
        Ok(())
    }

    /// Install the handler for one identifier.
    ///
    /// The schema for `id` may be registered before or after its handler.
    pub fn add_handler<F>(&mut self, id: u64, handler: F) -> Result<()>
    where
        F: FnMut(&Protocol) + Send + 'static,
    {
        if id == NON_STRUCT_ID {
            return Err(ReceiverError::ReservedIdentifier);
        }
        if self.handlers.contains_key(&id) {
            return Err(ReceiverError::DuplicateHandler(HandlerSlot::Struct(id)));
        }
        self.handlers.insert(id, Box::new(handler));
        Ok(())
    }

    /// Install the single handler for non-struct messages.
    pub fn add_non_struct_handler<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(&mut &[u8]) -> bool + Send + 'static,
    {
        if self.non_struct_handler.is_some() {
            return Err(ReceiverError::DuplicateHandler(HandlerSlot::NonStruct));
        }
        self.non_struct_handler = Some(Box::new(handler));
        Ok(())
    }

    /// Decode every message in `buffer`, stamping values with the current time.
    pub fn process(&mut self, buffer: &[u8]) -> Disposition {
        self.process_at(buffer, timestamp_now_ns())
    }

    /// Decode every message in `buffer`, stamping values with `timestamp_ns`.
    ///
    /// Struct messages are decoded in order until the buffer ends. A
    /// non-struct message, an unknown identifier or a truncated message
    /// ends processing and the remaining bytes are dropped.
    pub fn process_at(&mut self, buffer: &[u8], timestamp_ns: u64) -> Disposition {
        let Some(framing) = self.framing else {
            warn!(bytes = buffer.len(), "no struct protocols registered, dropping buffer");
            self.stats.unconfigured += 1;
            return self.abandon(AbandonReason::Unconfigured, buffer.len());
        };

        let mut cursor = buffer;
        while cursor.has_remaining() {
            let id = match framing
                .identifier_kind
                .decode_bits(&mut cursor, framing.byte_order)
            {
                Ok(id) => id,
                Err(err) => {
                    error!(error = %err, "truncated message identifier");
                    self.stats.truncated += 1;
                    return self.abandon(AbandonReason::Truncated, cursor.remaining());
                }
            };

            if id == NON_STRUCT_ID {
                return self.dispatch_non_struct(&mut cursor);
            }

            let Some(protocol) = self.instances.get(&id) else {
                error!(
                    id,
                    remaining = cursor.remaining(),
                    "unknown message identifier, dropping rest of buffer"
                );
                self.stats.unknown_identifier += 1;
                return self.abandon(AbandonReason::UnknownIdentifier, cursor.remaining());
            };

            if let Err(err) = protocol.from_stream(&mut cursor, timestamp_ns) {
                error!(
                    name = protocol.name(),
                    id,
                    error = %err,
                    "truncated struct message"
                );
                self.stats.truncated += 1;
                return self.abandon(AbandonReason::Truncated, cursor.remaining());
            }
            self.stats.messages += 1;

            match self.handlers.get_mut(&id) {
                Some(handler) => handler(protocol.as_ref()),
                None => {
                    warn!(name = protocol.name(), id, "no handler for struct message");
                    self.stats.unhandled += 1;
                }
            }
        }

        Disposition::Consumed
    }

    fn dispatch_non_struct(&mut self, cursor: &mut &[u8]) -> Disposition {
        let Some(handler) = self.non_struct_handler.as_mut() else {
            error!(
                remaining = cursor.remaining(),
                "no handler for non-struct message"
            );
            self.stats.non_struct_unhandled += 1;
            return self.abandon(AbandonReason::NonStructUnhandled, cursor.remaining());
        };

        self.stats.non_struct += 1;
        let handled = handler(cursor);
        let remaining = cursor.remaining();
        if !handled {
            error!(remaining, "failed to parse non-struct message");
            self.stats.non_struct_failed += 1;
            return self.abandon(AbandonReason::NonStructFailed, remaining);
        }

        if remaining > 0 {
            trace!(remaining, "bytes after non-struct message dropped");
            self.stats.abandoned_bytes += remaining as u64;
        }
        Disposition::NonStruct
    }

    fn abandon(&mut self, reason: AbandonReason, remaining: usize) -> Disposition {
        self.stats.abandoned_bytes += remaining as u64;
        Disposition::Abandoned(reason)
    }

    /// The shared decode instance for `id`.
    pub fn instance(&self, id: u64) -> Option<&Arc<Protocol>> {
        self.instances.get(&id)
    }

    /// Registered identifiers, ascending.
    pub fn identifiers(&self) -> impl Iterator<Item = u64> + '_ {
        self.instances.keys().copied()
    }

    pub fn framing(&self) -> Option<Framing> {
        self.framing
    }

    pub fn identifier_kind(&self) -> Option<PrimitiveKind> {
        self.framing.map(|framing| framing.identifier_kind)
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.framing.map(|framing| framing.byte_order)
    }

    /// The encoded non-struct identifier, for senders prefixing opaque payloads.
    pub fn non_struct_prefix(&self) -> Option<Bytes> {
        self.framing.map(|framing| {
            let mut buf = BytesMut::with_capacity(framing.identifier_kind.width());
            framing
                .identifier_kind
                .encode_bits(NON_STRUCT_ID, framing.byte_order, &mut buf);
            buf.freeze()
        })
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ReceiverStats::default();
    }
}
