use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

use crate::byte_order::ByteOrder;
use crate::error::Result;
use crate::kind::PrimitiveKind;
use crate::value::PrimitiveValue;

/// Shared handle to a live value holder.
pub type PrimitiveRef = Arc<Primitive>;

/// A live, typed value holder.
///
/// Decoding overwrites the stored bits in place; every clone of the
/// surrounding [`PrimitiveRef`] observes the new value immediately. Reads
/// and writes are single atomic operations and never allocate.
#[derive(Debug)]
pub struct Primitive {
    kind: PrimitiveKind,
    raw: AtomicU64,
    timestamp_ns: AtomicU64,
}

impl Primitive {
    /// Create a zero-valued holder.
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            raw: AtomicU64::new(0),
            timestamp_ns: AtomicU64::new(0),
        }
    }

    /// Create a zero-valued holder behind a shared handle.
    pub fn shared(kind: PrimitiveKind) -> PrimitiveRef {
        Arc::new(Self::new(kind))
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// Current raw storage bits.
    pub fn raw(&self) -> u64 {
        self.raw.load(Ordering::Acquire)
    }

    /// Atomically replace the raw bits with `f(current)` and return the
    /// previous bits.
    ///
    /// `f` may be called more than once under contention and must only
    /// produce bits that are valid for this holder's kind.
    pub fn update_raw<F>(&self, mut f: F) -> u64
    where
        F: FnMut(u64) -> u64,
    {
        let mut current = self.raw();
        loop {
            match self.raw.compare_exchange_weak(
                current,
                f(current),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return previous,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn value(&self) -> PrimitiveValue {
        self.kind.from_bits(self.raw())
    }

    /// Assign a new value, range-checked against this holder's kind.
    pub fn set(&self, value: impl Into<PrimitiveValue>) -> Result<()> {
        let bits = self.kind.to_bits(value.into())?;
        self.raw.store(bits, Ordering::Release);
        Ok(())
    }

    /// Nanoseconds since the Unix epoch of the last decode, `0` if never decoded.
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns.load(Ordering::Acquire)
    }

    /// Decode one value from `src` into this holder and stamp it.
    pub fn from_stream<B: Buf>(&self, src: &mut B, order: ByteOrder, timestamp_ns: u64) -> Result<()> {
        let bits = self.kind.decode_bits(src, order)?;
        self.raw.store(bits, Ordering::Release);
        self.timestamp_ns.store(timestamp_ns, Ordering::Release);
        Ok(())
    }

    /// Encode the current value onto `dst`.
    pub fn to_stream<B: BufMut>(&self, dst: &mut B, order: ByteOrder) {
        self.kind.encode_bits(self.raw(), order, dst);
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn timestamp_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::error::PrimitiveError;

    #[test]
    fn decode_overwrites_in_place_and_stamps() {
        let holder = Primitive::shared(PrimitiveKind::U16);
        let observer = Arc::clone(&holder);

        let mut src: &[u8] = &[0x01, 0x02];
        holder.from_stream(&mut src, ByteOrder::Big, 42).unwrap();

        assert_eq!(observer.value(), PrimitiveValue::UInt(0x0102));
        assert_eq!(observer.timestamp_ns(), 42);
    }

    #[test]
    fn failed_decode_keeps_previous_value() {
        let holder = Primitive::new(PrimitiveKind::U32);
        holder.set(7u32).unwrap();

        let mut src: &[u8] = &[0x00];
        let err = holder.from_stream(&mut src, ByteOrder::Big, 1).unwrap_err();

        assert!(matches!(err, PrimitiveError::TruncatedInput { .. }));
        assert_eq!(holder.value(), PrimitiveValue::UInt(7));
        assert_eq!(holder.timestamp_ns(), 0);
    }

    #[test]
    fn set_rejects_truncating_assignment() {
        let holder = Primitive::new(PrimitiveKind::I8);
        holder.set(-5i8).unwrap();
        assert!(holder.set(300u16).is_err());
        assert_eq!(holder.value(), PrimitiveValue::Int(-5));
    }

    #[test]
    fn to_stream_uses_requested_order() {
        let holder = Primitive::new(PrimitiveKind::U32);
        holder.set(0xDEADBEEFu32).unwrap();

        let mut big = BytesMut::new();
        holder.to_stream(&mut big, ByteOrder::Big);
        let mut little = BytesMut::new();
        holder.to_stream(&mut little, ByteOrder::Little);

        assert_eq!(big.as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(little.as_ref(), &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn update_raw_is_read_modify_write() {
        let holder = Primitive::new(PrimitiveKind::U16);
        holder.set(0x00F0u16).unwrap();
        let previous = holder.update_raw(|bits| bits | 0x000F);
        assert_eq!(previous, 0x00F0);
        assert_eq!(holder.raw(), 0x00FF);
    }

    #[test]
    fn clock_is_after_epoch() {
        assert!(timestamp_now_ns() > 0);
    }
}
