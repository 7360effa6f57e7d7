//! Fixed-width primitive codec and live value holders.
//!
//! This is the lowest layer of structwire. Every struct field, array
//! element and bit-field parent is a [`Primitive`]: one [`PrimitiveKind`]
//! plus lock-free storage for its current value and capture timestamp.
//!
//! Encoding and decoding always go through an explicit [`ByteOrder`] and
//! consume or produce exactly [`PrimitiveKind::width`] bytes.

pub mod byte_order;
pub mod error;
pub mod kind;
pub mod primitive;
pub mod value;

pub use byte_order::ByteOrder;
pub use error::{PrimitiveError, Result};
pub use kind::PrimitiveKind;
pub use primitive::{timestamp_now_ns, Primitive, PrimitiveRef};
pub use value::PrimitiveValue;
