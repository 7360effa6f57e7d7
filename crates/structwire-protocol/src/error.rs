use structwire_primitives::{ByteOrder, PrimitiveError, PrimitiveKind};

/// Errors that can occur while building or accessing struct schemas.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Primitive-level error (truncated input, out-of-range assignment).
    #[error("primitive error: {0}")]
    Primitive(#[from] PrimitiveError),

    /// An enum with the same name but a different domain is already registered.
    #[error("conflicting definition for enum '{0}'")]
    ConflictingDefinition(String),

    /// The enum domain is not a bijection.
    #[error("invalid enum '{name}': {reason}")]
    InvalidEnum { name: String, reason: String },

    /// A referenced enum is not registered.
    #[error("unknown enum '{0}'")]
    UnknownEnum(String),

    /// An integer has no symbolic name in its enum.
    #[error("enum '{name}' has no key for value {value}")]
    UnknownEnumValue { name: String, value: i128 },

    /// A symbolic name is not a key of its enum.
    #[error("enum '{name}' has no key '{key}'")]
    UnknownEnumKey { name: String, key: String },

    /// The field carries no enum, so it has no symbolic value.
    #[error("field '{0}' is not enumerated")]
    NotEnumerated(String),

    /// An array index is past the end of the array.
    #[error("index {index} out of range for array '{name}' (length {length})")]
    IndexOutOfRange {
        name: String,
        index: usize,
        length: usize,
    },

    /// An index was given for a scalar field.
    #[error("field '{0}' is not an array")]
    NotAnArray(String),

    /// No index was given for an array field.
    #[error("field '{0}' is an array and requires an index")]
    IndexRequired(String),

    /// No field with this name exists.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// No bit-field group with this id exists.
    #[error("unknown bit-field group {0}")]
    UnknownBitFieldGroup(usize),

    /// The name is already used within this protocol.
    #[error("duplicate field name '{0}'")]
    DuplicateFieldName(String),

    /// A bit-field group or member violates its layout constraints.
    #[error("invalid bit field '{name}': {reason}")]
    InvalidBitField { name: String, reason: String },

    /// Array lengths must be at least one.
    #[error("invalid array length for '{0}' (must be at least 1)")]
    InvalidArrayLength(String),

    /// The identifier kind is not an unsigned integer or cannot hold the id.
    #[error("identifier {id} cannot be encoded as {kind}")]
    InvalidIdentifier { id: u64, kind: PrimitiveKind },

    /// A nested protocol disagrees with its parent's byte order.
    #[error("protocol '{name}' uses {found} byte order (expected {expected})")]
    SchemaMismatch {
        name: String,
        expected: ByteOrder,
        found: ByteOrder,
    },

    /// A schema definition document is malformed.
    #[error("invalid schema definition: {0}")]
    Definition(String),

    /// A schema definition document is not valid JSON.
    #[error("schema definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
