use crate::kind::PrimitiveKind;
use crate::value::PrimitiveValue;

/// Errors that can occur while encoding, decoding or assigning primitives.
#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    /// The stream ended before a complete value could be read.
    #[error("truncated input decoding {kind} ({needed} bytes needed, {remaining} remaining)")]
    TruncatedInput {
        kind: PrimitiveKind,
        needed: usize,
        remaining: usize,
    },

    /// An integer does not fit the destination kind.
    #[error("value {value} out of range for {kind}")]
    ValueOutOfRange {
        kind: PrimitiveKind,
        value: PrimitiveValue,
    },

    /// The value cannot be represented by the destination kind at all.
    #[error("value {value} is not compatible with {kind}")]
    IncompatibleValue {
        kind: PrimitiveKind,
        value: PrimitiveValue,
    },

    /// A kind name could not be parsed.
    #[error("unknown primitive kind '{0}'")]
    UnknownKind(String),

    /// A byte order name could not be parsed.
    #[error("unknown byte order '{0}'")]
    UnknownByteOrder(String),
}

pub type Result<T> = std::result::Result<T, PrimitiveError>;
