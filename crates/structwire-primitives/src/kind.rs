use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::error::{PrimitiveError, Result};
use crate::value::PrimitiveValue;

/// A fixed-width wire primitive.
///
/// Raw storage for every kind is a `u64`: sign-extended two's complement
/// for signed integers, IEEE-754 bits for floats and `0`/`1` for bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    #[serde(rename = "int8", alias = "i8")]
    I8,
    #[serde(rename = "uint8", alias = "u8")]
    U8,
    #[serde(rename = "int16", alias = "i16")]
    I16,
    #[serde(rename = "uint16", alias = "u16")]
    U16,
    #[serde(rename = "int32", alias = "i32")]
    I32,
    #[serde(rename = "uint32", alias = "u32")]
    U32,
    #[serde(rename = "int64", alias = "i64")]
    I64,
    #[serde(rename = "uint64", alias = "u64")]
    U64,
    #[serde(rename = "float", alias = "float32", alias = "f32")]
    F32,
    #[serde(rename = "double", alias = "float64", alias = "f64")]
    F64,
    #[serde(rename = "bool", alias = "boolean")]
    Bool,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 11] = [
        PrimitiveKind::I8,
        PrimitiveKind::U8,
        PrimitiveKind::I16,
        PrimitiveKind::U16,
        PrimitiveKind::I32,
        PrimitiveKind::U32,
        PrimitiveKind::I64,
        PrimitiveKind::U64,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
        PrimitiveKind::Bool,
    ];

    /// Encoded size in bytes.
    pub const fn width(self) -> usize {
        match self {
            PrimitiveKind::I8 | PrimitiveKind::U8 | PrimitiveKind::Bool => 1,
            PrimitiveKind::I16 | PrimitiveKind::U16 => 2,
            PrimitiveKind::I32 | PrimitiveKind::U32 | PrimitiveKind::F32 => 4,
            PrimitiveKind::I64 | PrimitiveKind::U64 | PrimitiveKind::F64 => 8,
        }
    }

    /// Encoded size in bits.
    pub const fn bits(self) -> u32 {
        (self.width() * 8) as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::I8 => "int8",
            PrimitiveKind::U8 => "uint8",
            PrimitiveKind::I16 => "int16",
            PrimitiveKind::U16 => "uint16",
            PrimitiveKind::I32 => "int32",
            PrimitiveKind::U32 => "uint32",
            PrimitiveKind::I64 => "int64",
            PrimitiveKind::U64 => "uint64",
            PrimitiveKind::F32 => "float",
            PrimitiveKind::F64 => "double",
            PrimitiveKind::Bool => "bool",
        }
    }

    pub const fn is_integer(self) -> bool {
        !self.is_float() && !self.is_boolean()
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::I8
                | PrimitiveKind::I16
                | PrimitiveKind::I32
                | PrimitiveKind::I64
                | PrimitiveKind::F32
                | PrimitiveKind::F64
        )
    }

    pub const fn is_unsigned_integer(self) -> bool {
        self.is_integer() && !self.is_signed()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::F32 | PrimitiveKind::F64)
    }

    pub const fn is_boolean(self) -> bool {
        matches!(self, PrimitiveKind::Bool)
    }

    /// The narrowest unsigned kind able to hold `bits` bits.
    pub const fn narrowest_unsigned(bits: u32) -> Option<PrimitiveKind> {
        match bits {
            0 => None,
            1..=8 => Some(PrimitiveKind::U8),
            9..=16 => Some(PrimitiveKind::U16),
            17..=32 => Some(PrimitiveKind::U32),
            33..=64 => Some(PrimitiveKind::U64),
            _ => None,
        }
    }

    /// Decode one value's raw storage bits, consuming exactly `width()` bytes.
    ///
    /// Nothing is consumed when fewer than `width()` bytes remain.
    pub fn decode_bits<B: Buf>(self, src: &mut B, order: ByteOrder) -> Result<u64> {
        let needed = self.width();
        if src.remaining() < needed {
            return Err(PrimitiveError::TruncatedInput {
                kind: self,
                needed,
                remaining: src.remaining(),
            });
        }

        let big = order == ByteOrder::Big;
        let bits = match self {
            PrimitiveKind::I8 => src.get_i8() as i64 as u64,
            PrimitiveKind::U8 => u64::from(src.get_u8()),
            PrimitiveKind::Bool => u64::from(src.get_u8() != 0),
            PrimitiveKind::I16 if big => src.get_i16() as i64 as u64,
            PrimitiveKind::I16 => src.get_i16_le() as i64 as u64,
            PrimitiveKind::U16 if big => u64::from(src.get_u16()),
            PrimitiveKind::U16 => u64::from(src.get_u16_le()),
            PrimitiveKind::I32 if big => src.get_i32() as i64 as u64,
            PrimitiveKind::I32 => src.get_i32_le() as i64 as u64,
            PrimitiveKind::U32 | PrimitiveKind::F32 if big => u64::from(src.get_u32()),
            PrimitiveKind::U32 | PrimitiveKind::F32 => u64::from(src.get_u32_le()),
            PrimitiveKind::I64 | PrimitiveKind::U64 | PrimitiveKind::F64 if big => src.get_u64(),
            PrimitiveKind::I64 | PrimitiveKind::U64 | PrimitiveKind::F64 => src.get_u64_le(),
        };
        Ok(bits)
    }

    /// Encode raw storage bits as exactly `width()` bytes.
    ///
    /// `bits` must come from [`PrimitiveKind::to_bits`] or a decode of the
    /// same kind; higher bits are dropped.
    pub fn encode_bits<B: BufMut>(self, bits: u64, order: ByteOrder, dst: &mut B) {
        let big = order == ByteOrder::Big;
        match self.width() {
            1 => dst.put_u8(bits as u8),
            2 if big => dst.put_u16(bits as u16),
            2 => dst.put_u16_le(bits as u16),
            4 if big => dst.put_u32(bits as u32),
            4 => dst.put_u32_le(bits as u32),
            _ if big => dst.put_u64(bits),
            _ => dst.put_u64_le(bits),
        }
    }

    /// Decode one value, consuming exactly `width()` bytes.
    pub fn decode<B: Buf>(self, src: &mut B, order: ByteOrder) -> Result<PrimitiveValue> {
        self.decode_bits(src, order).map(|bits| self.from_bits(bits))
    }

    /// Encode one value as exactly `width()` bytes.
    pub fn encode<B: BufMut>(
        self,
        value: PrimitiveValue,
        order: ByteOrder,
        dst: &mut B,
    ) -> Result<()> {
        let bits = self.to_bits(value)?;
        self.encode_bits(bits, order, dst);
        Ok(())
    }

    /// Interpret raw storage bits as a value of this kind.
    pub fn from_bits(self, bits: u64) -> PrimitiveValue {
        match self {
            PrimitiveKind::Bool => PrimitiveValue::Bool(bits != 0),
            PrimitiveKind::I8 | PrimitiveKind::I16 | PrimitiveKind::I32 | PrimitiveKind::I64 => {
                PrimitiveValue::Int(bits as i64)
            }
            PrimitiveKind::U8 | PrimitiveKind::U16 | PrimitiveKind::U32 | PrimitiveKind::U64 => {
                PrimitiveValue::UInt(bits)
            }
            PrimitiveKind::F32 => PrimitiveValue::Float(f64::from(f32::from_bits(bits as u32))),
            PrimitiveKind::F64 => PrimitiveValue::Float(f64::from_bits(bits)),
        }
    }

    /// Convert a value into this kind's raw storage bits.
    ///
    /// Integers that do not fit, and finite values beyond `f32` range, fail
    /// with `ValueOutOfRange`; floats assigned to integer kinds and non-0/1
    /// integers assigned to bool fail with `IncompatibleValue`.
    pub fn to_bits(self, value: PrimitiveValue) -> Result<u64> {
        match self {
            PrimitiveKind::Bool => value
                .as_bool()
                .map(u64::from)
                .ok_or(PrimitiveError::IncompatibleValue { kind: self, value }),
            PrimitiveKind::F32 => {
                let wide = value.as_f64();
                let narrow = wide as f32;
                if wide.is_finite() && narrow.is_infinite() {
                    return Err(PrimitiveError::ValueOutOfRange { kind: self, value });
                }
                Ok(u64::from(narrow.to_bits()))
            }
            PrimitiveKind::F64 => Ok(value.as_f64().to_bits()),
            _ => {
                let wide = match value {
                    PrimitiveValue::Bool(flag) => i128::from(flag),
                    PrimitiveValue::Int(int) => i128::from(int),
                    PrimitiveValue::UInt(int) => i128::from(int),
                    PrimitiveValue::Float(_) => {
                        return Err(PrimitiveError::IncompatibleValue { kind: self, value })
                    }
                };

                let (min, max) = self.integer_range();
                if wide < min || wide > max {
                    return Err(PrimitiveError::ValueOutOfRange { kind: self, value });
                }

                if self.is_signed() {
                    Ok(wide as i64 as u64)
                } else {
                    Ok(wide as u64)
                }
            }
        }
    }

    fn integer_range(self) -> (i128, i128) {
        let bits = self.bits();
        if self.is_signed() {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveKind {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "int8" | "i8" => PrimitiveKind::I8,
            "uint8" | "u8" => PrimitiveKind::U8,
            "int16" | "i16" => PrimitiveKind::I16,
            "uint16" | "u16" => PrimitiveKind::U16,
            "int32" | "i32" => PrimitiveKind::I32,
            "uint32" | "u32" => PrimitiveKind::U32,
            "int64" | "i64" => PrimitiveKind::I64,
            "uint64" | "u64" => PrimitiveKind::U64,
            "float" | "float32" | "f32" => PrimitiveKind::F32,
            "double" | "float64" | "f64" => PrimitiveKind::F64,
            "bool" | "boolean" => PrimitiveKind::Bool,
            _ => return Err(PrimitiveError::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}
