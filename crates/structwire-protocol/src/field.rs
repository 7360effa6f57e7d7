use std::sync::Arc;

use structwire_primitives::{
    Primitive, PrimitiveError, PrimitiveKind, PrimitiveRef, PrimitiveValue,
};

use crate::error::{ProtocolError, Result};

/// One scalar or fixed-length array field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: PrimitiveKind,
    /// Absent for scalars.
    pub array_length: Option<usize>,
    pub commandable: bool,
    /// Name of the enum this field's integers are drawn from.
    pub enum_name: Option<String>,
}

impl FieldSpec {
    /// A read-only scalar field.
    pub fn new(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_length: None,
            commandable: false,
            enum_name: None,
        }
    }

    pub fn with_array_length(mut self, length: usize) -> Self {
        self.array_length = Some(length);
        self
    }

    pub fn with_commandable(mut self, commandable: bool) -> Self {
        self.commandable = commandable;
        self
    }

    pub fn with_enum(mut self, enum_name: impl Into<String>) -> Self {
        self.enum_name = Some(enum_name.into());
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_length.is_some()
    }

    /// Number of wire elements (1 for scalars).
    pub fn element_count(&self) -> usize {
        self.array_length.unwrap_or(1)
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.kind.width() * self.element_count()
    }
}

/// One member of a bit-field group: `width` bits starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFieldSpec {
    pub name: String,
    pub offset: u32,
    pub width: u32,
    pub commandable: bool,
    pub enum_name: Option<String>,
}

impl BitFieldSpec {
    pub fn new(name: impl Into<String>, offset: u32, width: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            width,
            commandable: false,
            enum_name: None,
        }
    }

    pub fn with_commandable(mut self, commandable: bool) -> Self {
        self.commandable = commandable;
        self
    }

    pub fn with_enum(mut self, enum_name: impl Into<String>) -> Self {
        self.enum_name = Some(enum_name.into());
        self
    }

    /// Unshifted mask covering `width` bits.
    pub fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Kind a member value is presented as: bool for single bits,
    /// otherwise the narrowest unsigned kind holding `width` bits.
    pub fn kind(&self) -> PrimitiveKind {
        if self.width == 1 {
            PrimitiveKind::Bool
        } else {
            PrimitiveKind::narrowest_unsigned(self.width).unwrap_or(PrimitiveKind::U64)
        }
    }
}

/// A live view of one bit-field member over its group's parent integer.
#[derive(Debug, Clone)]
pub struct BitField {
    spec: Arc<BitFieldSpec>,
    parent: PrimitiveRef,
}

impl BitField {
    pub fn spec(&self) -> &BitFieldSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.spec.kind()
    }

    pub fn parent(&self) -> &PrimitiveRef {
        &self.parent
    }

    /// The member's bits, shifted down and masked.
    pub fn raw(&self) -> u64 {
        (self.parent.raw() >> self.spec.offset) & self.spec.mask()
    }

    pub fn value(&self) -> PrimitiveValue {
        self.kind().from_bits(self.raw())
    }

    /// Read-modify-write the member's bits within the parent.
    ///
    /// Values wider than the member fail with `ValueOutOfRange` and leave
    /// the parent unchanged.
    pub fn set(&self, value: impl Into<PrimitiveValue>) -> structwire_primitives::Result<()> {
        let value = value.into();
        let kind = self.kind();
        let bits = kind.to_bits(value)?;
        let mask = self.spec.mask();
        if bits > mask {
            return Err(PrimitiveError::ValueOutOfRange { kind, value });
        }

        let offset = self.spec.offset;
        self.parent
            .update_raw(|current| (current & !(mask << offset)) | (bits << offset));
        Ok(())
    }

    /// True if both views address the same bits of the same parent.
    pub fn same_storage(&self, other: &BitField) -> bool {
        Arc::ptr_eq(&self.parent, &other.parent)
            && self.spec.offset == other.spec.offset
            && self.spec.width == other.spec.width
    }
}

/// A set of bit-field members packed into one unsigned parent integer.
#[derive(Debug)]
pub struct BitFields {
    name: String,
    parent: PrimitiveRef,
    fields: Vec<BitField>,
}

impl BitFields {
    /// Create a group over a fresh parent of `kind`.
    ///
    /// The parent must be an unsigned integer kind; members must have a
    /// non-zero width, fit within the parent and not overlap.
    pub fn new(name: impl Into<String>, kind: PrimitiveKind, members: Vec<BitFieldSpec>) -> Result<Self> {
        let name = name.into();
        if !kind.is_unsigned_integer() {
            return Err(ProtocolError::InvalidBitField {
                name,
                reason: format!("parent kind {kind} is not an unsigned integer"),
            });
        }

        let mut occupied = 0u64;
        for (index, member) in members.iter().enumerate() {
            if member.width == 0 {
                return Err(invalid_member(member, "width must be at least 1".to_string()));
            }
            let end = u64::from(member.offset) + u64::from(member.width);
            if end > u64::from(kind.bits()) {
                return Err(invalid_member(
                    member,
                    format!(
                        "bits {}..{end} exceed the {}-bit parent",
                        member.offset,
                        kind.bits()
                    ),
                ));
            }
            let bits = member.mask() << member.offset;
            if occupied & bits != 0 {
                return Err(invalid_member(member, "overlaps another member".to_string()));
            }
            occupied |= bits;

            if members[..index].iter().any(|other| other.name == member.name) {
                return Err(ProtocolError::DuplicateFieldName(member.name.clone()));
            }
        }

        let parent = Primitive::shared(kind);
        let fields = members
            .into_iter()
            .map(|spec| BitField {
                spec: Arc::new(spec),
                parent: Arc::clone(&parent),
            })
            .collect();

        Ok(Self {
            name,
            parent,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.parent.kind()
    }

    pub fn parent(&self) -> &PrimitiveRef {
        &self.parent
    }

    /// Members in declaration order.
    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Same layout over a fresh, zeroed parent.
    pub fn instance(&self) -> Self {
        let parent = Primitive::shared(self.kind());
        let fields = self
            .fields
            .iter()
            .map(|field| BitField {
                spec: Arc::clone(&field.spec),
                parent: Arc::clone(&parent),
            })
            .collect();

        Self {
            name: self.name.clone(),
            parent,
            fields,
        }
    }
}

fn invalid_member(member: &BitFieldSpec, reason: String) -> ProtocolError {
    ProtocolError::InvalidBitField {
        name: member.name.clone(),
        reason,
    }
}
