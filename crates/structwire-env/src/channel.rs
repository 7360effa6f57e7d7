use std::sync::Arc;

use structwire_primitives::{PrimitiveKind, PrimitiveRef, PrimitiveValue};
use structwire_protocol::BitField;

/// Position of a channel in its environment's creation order.
pub type ChannelId = usize;

/// The live value a channel reads and commands.
#[derive(Debug, Clone)]
pub enum ChannelSource {
    /// A scalar field or one array element.
    Primitive(PrimitiveRef),
    /// One member of a bit-field group.
    BitField(BitField),
}

impl ChannelSource {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            ChannelSource::Primitive(holder) => holder.kind(),
            ChannelSource::BitField(field) => field.kind(),
        }
    }

    pub fn value(&self) -> PrimitiveValue {
        match self {
            ChannelSource::Primitive(holder) => holder.value(),
            ChannelSource::BitField(field) => field.value(),
        }
    }

    pub fn set(&self, value: PrimitiveValue) -> structwire_primitives::Result<()> {
        match self {
            ChannelSource::Primitive(holder) => holder.set(value),
            ChannelSource::BitField(field) => field.set(value),
        }
    }

    /// Capture time of the last decode, `0` if never decoded.
    pub fn timestamp_ns(&self) -> u64 {
        match self {
            ChannelSource::Primitive(holder) => holder.timestamp_ns(),
            ChannelSource::BitField(field) => field.parent().timestamp_ns(),
        }
    }

    /// True if both sources read and write the same storage.
    pub fn same_source(&self, other: &ChannelSource) -> bool {
        match (self, other) {
            (ChannelSource::Primitive(a), ChannelSource::Primitive(b)) => Arc::ptr_eq(a, b),
            (ChannelSource::BitField(a), ChannelSource::BitField(b)) => a.same_storage(b),
            _ => false,
        }
    }
}

/// A named, typed view of one live value.
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) id: ChannelId,
    pub(crate) name: String,
    pub(crate) source: ChannelSource,
    pub(crate) commandable: bool,
    pub(crate) enum_name: Option<String>,
    pub(crate) default: Option<PrimitiveValue>,
}

impl Channel {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.source.kind()
    }

    pub fn source(&self) -> &ChannelSource {
        &self.source
    }

    pub fn commandable(&self) -> bool {
        self.commandable
    }

    pub fn enum_name(&self) -> Option<&str> {
        self.enum_name.as_deref()
    }

    pub fn default(&self) -> Option<PrimitiveValue> {
        self.default
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn value(&self) -> PrimitiveValue {
        self.source.value()
    }
}

#[cfg(test)]
mod tests {
    use structwire_primitives::Primitive;
    use structwire_protocol::{BitFieldSpec, BitFields};

    use super::*;

    #[test]
    fn same_source_compares_storage_not_values() {
        let a = Primitive::shared(PrimitiveKind::U8);
        let b = Primitive::shared(PrimitiveKind::U8);

        let source = ChannelSource::Primitive(Arc::clone(&a));
        assert!(source.same_source(&ChannelSource::Primitive(a)));
        assert!(!source.same_source(&ChannelSource::Primitive(b)));
    }

    #[test]
    fn bit_field_sources_write_through_to_parent() {
        let group = BitFields::new(
            "flags",
            PrimitiveKind::U8,
            vec![BitFieldSpec::new("low", 0, 4), BitFieldSpec::new("high", 4, 4)],
        )
        .unwrap();
        let high = ChannelSource::BitField(group.fields()[1].clone());
        let low = ChannelSource::BitField(group.fields()[0].clone());

        high.set(PrimitiveValue::UInt(0xA)).unwrap();
        assert_eq!(group.parent().raw(), 0xA0);
        assert_eq!(high.kind(), PrimitiveKind::U8);
        assert!(!high.same_source(&low));
        assert!(high.same_source(&ChannelSource::BitField(group.fields()[1].clone())));
    }
}
