use std::fmt;

use serde::{Deserialize, Serialize};

/// A decoded primitive value.
///
/// Signed integers widen to `Int`, unsigned integers to `UInt` and both
/// float widths to `Float`. Storage kinds decide how a value is narrowed
/// back onto the wire (see [`crate::PrimitiveKind::to_bits`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl PrimitiveValue {
    /// The value as a signed integer, if it is an integer (or bool) that fits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            PrimitiveValue::Bool(value) => Some(i64::from(value)),
            PrimitiveValue::Int(value) => Some(value),
            PrimitiveValue::UInt(value) => i64::try_from(value).ok(),
            PrimitiveValue::Float(_) => None,
        }
    }

    /// The value as an unsigned integer, if it is a non-negative integer (or bool).
    pub fn as_u64(self) -> Option<u64> {
        match self {
            PrimitiveValue::Bool(value) => Some(u64::from(value)),
            PrimitiveValue::Int(value) => u64::try_from(value).ok(),
            PrimitiveValue::UInt(value) => Some(value),
            PrimitiveValue::Float(_) => None,
        }
    }

    /// The value as a float. Integers convert, possibly losing precision.
    pub fn as_f64(self) -> f64 {
        match self {
            PrimitiveValue::Bool(value) => f64::from(u8::from(value)),
            PrimitiveValue::Int(value) => value as f64,
            PrimitiveValue::UInt(value) => value as f64,
            PrimitiveValue::Float(value) => value,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            PrimitiveValue::Bool(value) => Some(value),
            PrimitiveValue::Int(0) | PrimitiveValue::UInt(0) => Some(false),
            PrimitiveValue::Int(1) | PrimitiveValue::UInt(1) => Some(true),
            _ => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveValue::Float(_))
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Bool(value) => write!(f, "{value}"),
            PrimitiveValue::Int(value) => write!(f, "{value}"),
            PrimitiveValue::UInt(value) => write!(f, "{value}"),
            PrimitiveValue::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        PrimitiveValue::Bool(value)
    }
}

impl From<f32> for PrimitiveValue {
    fn from(value: f32) -> Self {
        PrimitiveValue::Float(f64::from(value))
    }
}

impl From<f64> for PrimitiveValue {
    fn from(value: f64) -> Self {
        PrimitiveValue::Float(value)
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PrimitiveValue {
            fn from(value: $ty) -> Self {
                PrimitiveValue::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PrimitiveValue {
            fn from(value: $ty) -> Self {
                PrimitiveValue::UInt(u64::from(value))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_views_respect_sign() {
        assert_eq!(PrimitiveValue::Int(-1).as_u64(), None);
        assert_eq!(PrimitiveValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(PrimitiveValue::UInt(7).as_i64(), Some(7));
        assert_eq!(PrimitiveValue::Float(1.0).as_i64(), None);
    }

    #[test]
    fn bool_view_accepts_zero_and_one_only() {
        assert_eq!(PrimitiveValue::UInt(1).as_bool(), Some(true));
        assert_eq!(PrimitiveValue::Int(0).as_bool(), Some(false));
        assert_eq!(PrimitiveValue::Int(2).as_bool(), None);
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![
            PrimitiveValue::Bool(true),
            PrimitiveValue::Int(-3),
            PrimitiveValue::Float(0.5),
        ])
        .unwrap();
        assert_eq!(json, "[true,-3,0.5]");
    }
}
