//! Struct schemas mirroring the exact memory layout of wire messages.
//!
//! A [`Protocol`] is an ordered composition of scalar fields, fixed-length
//! arrays, bit-field groups and nested (or arrays of nested) protocols.
//! Each protocol owns its live storage: decoding a message overwrites the
//! values in place instead of allocating a new instance per message.
//!
//! Enumerations referenced by fields live in an [`EnumRegistry`]; resolving
//! a decoded integer to its symbolic name is a separate, explicit step.

pub mod definition;
pub mod enums;
pub mod error;
pub mod factory;
pub mod field;
pub mod protocol;
pub mod snapshot;

pub use definition::{
    BitFieldDefinition, EnumDefinition, FieldDefinition, ProtocolDefinition, SchemaDefinition,
};
pub use enums::{EnumDef, EnumRegistry};
pub use error::{ProtocolError, Result};
pub use factory::{ProtocolFactory, Singletons};
pub use field::{BitField, BitFieldSpec, BitFields, FieldSpec};
pub use protocol::{BuildItem, Protocol, DEFAULT_IDENTIFIER_KIND};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use structwire_primitives::{ByteOrder, Primitive, PrimitiveKind, PrimitiveRef, PrimitiveValue};
