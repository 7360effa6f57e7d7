use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use structwire_primitives::{ByteOrder, Primitive, PrimitiveKind, PrimitiveRef, PrimitiveValue};
use tracing::trace;

use crate::enums::{EnumDef, EnumRegistry};
use crate::error::{ProtocolError, Result};
use crate::field::{BitField, BitFieldSpec, BitFields, FieldSpec};
use crate::snapshot::{Snapshot, SnapshotEntry};

/// Identifier kind used when none is configured.
pub const DEFAULT_IDENTIFIER_KIND: PrimitiveKind = PrimitiveKind::U16;

/// One entry of a protocol's build order, as seen by schema walkers.
#[derive(Debug, Clone, Copy)]
pub enum BuildItem<'a> {
    Scalar(&'a FieldSpec),
    Array(&'a FieldSpec),
    BitFields { id: usize, group: &'a BitFields },
    NestedOne { name: &'a str, protocol: &'a Protocol },
    NestedMany { name: &'a str, protocols: &'a [Protocol] },
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Field(usize),
    BitFields(usize),
    Nested(usize),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Field(usize),
    BitFields(usize),
    BitField { group: usize, member: usize },
    Nested(usize),
}

#[derive(Debug)]
struct FieldSlot {
    spec: FieldSpec,
    elements: Vec<PrimitiveRef>,
}

#[derive(Debug)]
struct NestedSlot {
    name: String,
    array_length: Option<usize>,
    instances: Vec<Protocol>,
}

/// A struct schema together with its live decode storage.
///
/// Build one with [`Protocol::new`] and the `add_*` methods, then share it
/// (typically as an `Arc<Protocol>`). Decoding takes `&self`: values are
/// overwritten in place through atomic holders, so every
/// [`PrimitiveRef`] handed out by [`Protocol::get_primitive`] observes
/// each new message.
#[derive(Debug)]
pub struct Protocol {
    name: String,
    id: u64,
    id_kind: PrimitiveKind,
    byte_order: ByteOrder,
    build: Vec<Entry>,
    fields: Vec<FieldSlot>,
    bit_fields: Vec<BitFields>,
    nested: Vec<NestedSlot>,
    names: HashMap<String, Slot>,
    enum_registry: EnumRegistry,
}

impl Protocol {
    /// An empty big-endian schema with a `uint16` identifier.
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
            id_kind: DEFAULT_IDENTIFIER_KIND,
            byte_order: ByteOrder::default(),
            build: Vec::new(),
            fields: Vec::new(),
            bit_fields: Vec::new(),
            nested: Vec::new(),
            names: HashMap::new(),
            enum_registry: EnumRegistry::new(),
        }
    }

    /// Set the identifier kind. It must be an unsigned integer able to hold the id.
    pub fn with_identifier_kind(mut self, kind: PrimitiveKind) -> Result<Self> {
        self.id_kind = kind;
        self.check_identifier()?;
        Ok(self)
    }

    /// Set the byte order of this schema and every nested schema.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.set_byte_order(order);
        self
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
        for slot in &mut self.nested {
            for instance in &mut slot.instances {
                instance.set_byte_order(order);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identifier_kind(&self) -> PrimitiveKind {
        self.id_kind
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn enum_registry(&self) -> &EnumRegistry {
        &self.enum_registry
    }

    /// Fails with `InvalidIdentifier` unless the id fits the identifier kind.
    pub fn check_identifier(&self) -> Result<()> {
        let fits = self.id_kind.is_unsigned_integer()
            && self.id_kind.to_bits(PrimitiveValue::UInt(self.id)).is_ok();
        if fits {
            Ok(())
        } else {
            Err(ProtocolError::InvalidIdentifier {
                id: self.id,
                kind: self.id_kind,
            })
        }
    }

    /// Register an enum local to this schema.
    pub fn register_enum(&mut self, definition: impl Into<Arc<EnumDef>>) -> Result<()> {
        self.enum_registry.register(definition)
    }

    /// Append a scalar or array field.
    pub fn add_field(&mut self, spec: FieldSpec) -> Result<()> {
        if spec.array_length == Some(0) {
            return Err(ProtocolError::InvalidArrayLength(spec.name));
        }
        if let Some(enum_name) = &spec.enum_name {
            self.enum_registry.require(enum_name)?;
        }
        self.claim_name(&spec.name)?;

        let index = self.fields.len();
        let elements = (0..spec.element_count())
            .map(|_| Primitive::shared(spec.kind))
            .collect();
        self.names.insert(spec.name.clone(), Slot::Field(index));
        self.fields.push(FieldSlot { spec, elements });
        self.build.push(Entry::Field(index));
        Ok(())
    }

    /// Append a bit-field group over a new unsigned parent integer.
    ///
    /// Returns the group id used by [`Protocol::get_fields`].
    pub fn add_bit_fields(
        &mut self,
        name: impl Into<String>,
        kind: PrimitiveKind,
        members: Vec<BitFieldSpec>,
    ) -> Result<usize> {
        let name = name.into();
        self.claim_name(&name)?;
        for member in &members {
            if member.name == name {
                return Err(ProtocolError::DuplicateFieldName(name));
            }
            self.claim_name(&member.name)?;
            if let Some(enum_name) = &member.enum_name {
                self.enum_registry.require(enum_name)?;
            }
        }

        let group = BitFields::new(name.clone(), kind, members)?;
        let id = self.bit_fields.len();
        for (member, field) in group.fields().iter().enumerate() {
            self.names
                .insert(field.name().to_string(), Slot::BitField { group: id, member });
        }
        self.names.insert(name, Slot::BitFields(id));
        self.bit_fields.push(group);
        self.build.push(Entry::BitFields(id));
        Ok(id)
    }

    /// Append a nested struct (`array_length` of `None`) or a fixed-size
    /// array of nested structs, each with fresh storage copied from
    /// `template`'s layout. The template's enums are merged into this schema.
    pub fn add_serializable(
        &mut self,
        name: impl Into<String>,
        template: &Protocol,
        array_length: Option<usize>,
    ) -> Result<()> {
        let name = name.into();
        if array_length == Some(0) {
            return Err(ProtocolError::InvalidArrayLength(name));
        }
        if template.byte_order != self.byte_order {
            return Err(ProtocolError::SchemaMismatch {
                name: template.name.clone(),
                expected: self.byte_order,
                found: template.byte_order,
            });
        }
        self.claim_name(&name)?;
        self.enum_registry
            .register_from_other(&template.enum_registry)?;

        let instances = (0..array_length.unwrap_or(1))
            .map(|_| template.instance())
            .collect();
        let index = self.nested.len();
        self.names.insert(name.clone(), Slot::Nested(index));
        self.nested.push(NestedSlot {
            name,
            array_length,
            instances,
        });
        self.build.push(Entry::Nested(index));
        Ok(())
    }

    fn claim_name(&self, name: &str) -> Result<()> {
        if self.names.contains_key(name) {
            return Err(ProtocolError::DuplicateFieldName(name.to_string()));
        }
        Ok(())
    }

    /// Walk the build order.
    pub fn build(&self) -> impl Iterator<Item = BuildItem<'_>> + '_ {
        self.build.iter().map(move |entry| match *entry {
            Entry::Field(index) => {
                let spec = &self.fields[index].spec;
                if spec.is_array() {
                    BuildItem::Array(spec)
                } else {
                    BuildItem::Scalar(spec)
                }
            }
            Entry::BitFields(id) => BuildItem::BitFields {
                id,
                group: &self.bit_fields[id],
            },
            Entry::Nested(index) => {
                let slot = &self.nested[index];
                match slot.array_length {
                    Some(_) => BuildItem::NestedMany {
                        name: &slot.name,
                        protocols: &slot.instances,
                    },
                    None => BuildItem::NestedOne {
                        name: &slot.name,
                        protocol: &slot.instances[0],
                    },
                }
            }
        })
    }

    /// Live holder for a scalar field, an element of an array field, or
    /// the parent integer of a bit-field group.
    pub fn get_primitive(&self, name: &str, index: Option<usize>) -> Result<&PrimitiveRef> {
        match (self.names.get(name), index) {
            (Some(Slot::Field(slot)), _) => {
                let slot = &self.fields[*slot];
                match (slot.spec.array_length, index) {
                    (None, None) => Ok(&slot.elements[0]),
                    (None, Some(_)) => Err(ProtocolError::NotAnArray(name.to_string())),
                    (Some(_), None) => Err(ProtocolError::IndexRequired(name.to_string())),
                    (Some(length), Some(index)) => {
                        slot.elements
                            .get(index)
                            .ok_or_else(|| ProtocolError::IndexOutOfRange {
                                name: name.to_string(),
                                index,
                                length,
                            })
                    }
                }
            }
            (Some(Slot::BitFields(id)), None) => Ok(self.bit_fields[*id].parent()),
            (Some(Slot::BitFields(_)), Some(_)) => Err(ProtocolError::NotAnArray(name.to_string())),
            _ => Err(ProtocolError::UnknownField(name.to_string())),
        }
    }

    /// The bit-field group with the given id.
    pub fn get_fields(&self, id: usize) -> Result<&BitFields> {
        self.bit_fields
            .get(id)
            .ok_or(ProtocolError::UnknownBitFieldGroup(id))
    }

    /// A bit-field member by name.
    pub fn bit_field(&self, name: &str) -> Result<&BitField> {
        match self.names.get(name) {
            Some(Slot::BitField { group, member }) => {
                Ok(&self.bit_fields[*group].fields()[*member])
            }
            _ => Err(ProtocolError::UnknownField(name.to_string())),
        }
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        match self.names.get(name) {
            Some(Slot::Field(index)) => Some(&self.fields[*index].spec),
            _ => None,
        }
    }

    /// Nested instances registered under `name` (one for a plain nested struct).
    pub fn serializables(&self, name: &str) -> Option<&[Protocol]> {
        match self.names.get(name) {
            Some(Slot::Nested(index)) => Some(&self.nested[*index].instances),
            _ => None,
        }
    }

    /// Encoded body size in bytes (identifier excluded).
    pub fn size(&self) -> usize {
        self.build
            .iter()
            .map(|entry| match *entry {
                Entry::Field(index) => self.fields[index].spec.size(),
                Entry::BitFields(id) => self.bit_fields[id].kind().width(),
                Entry::Nested(index) => self.nested[index]
                    .instances
                    .iter()
                    .map(Protocol::size)
                    .sum(),
            })
            .sum()
    }

    /// Decode a message body into this instance, in build order.
    ///
    /// On `TruncatedInput` the fields decoded so far keep their new values
    /// and the rest keep their old ones.
    pub fn from_stream<B: Buf>(&self, src: &mut B, timestamp_ns: u64) -> Result<()> {
        let order = self.byte_order;
        for entry in &self.build {
            match *entry {
                Entry::Field(index) => {
                    for element in &self.fields[index].elements {
                        element.from_stream(src, order, timestamp_ns)?;
                    }
                }
                Entry::BitFields(id) => {
                    self.bit_fields[id]
                        .parent()
                        .from_stream(src, order, timestamp_ns)?;
                }
                Entry::Nested(index) => {
                    for instance in &self.nested[index].instances {
                        instance.from_stream(src, timestamp_ns)?;
                    }
                }
            }
        }
        trace!(name = %self.name, id = self.id, "decoded struct");
        Ok(())
    }

    /// Encode the current values (body only) in build order.
    pub fn to_stream<B: BufMut>(&self, dst: &mut B) {
        let order = self.byte_order;
        for entry in &self.build {
            match *entry {
                Entry::Field(index) => {
                    for element in &self.fields[index].elements {
                        element.to_stream(dst, order);
                    }
                }
                Entry::BitFields(id) => self.bit_fields[id].parent().to_stream(dst, order),
                Entry::Nested(index) => {
                    for instance in &self.nested[index].instances {
                        instance.to_stream(dst);
                    }
                }
            }
        }
    }

    /// The encoded body.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        self.to_stream(&mut buf);
        buf.freeze()
    }

    /// The encoded identifier followed by the body.
    pub fn encode_message(&self) -> Result<Bytes> {
        self.check_identifier()?;
        let mut buf = BytesMut::with_capacity(self.id_kind.width() + self.size());
        self.id_kind.encode_bits(self.id, self.byte_order, &mut buf);
        self.to_stream(&mut buf);
        Ok(buf.freeze())
    }

    /// A copy of this layout with fresh, zeroed storage.
    pub fn instance(&self) -> Protocol {
        Protocol {
            name: self.name.clone(),
            id: self.id,
            id_kind: self.id_kind,
            byte_order: self.byte_order,
            build: self.build.clone(),
            fields: self
                .fields
                .iter()
                .map(|slot| FieldSlot {
                    spec: slot.spec.clone(),
                    elements: (0..slot.elements.len())
                        .map(|_| Primitive::shared(slot.spec.kind))
                        .collect(),
                })
                .collect(),
            bit_fields: self.bit_fields.iter().map(BitFields::instance).collect(),
            nested: self
                .nested
                .iter()
                .map(|slot| NestedSlot {
                    name: slot.name.clone(),
                    array_length: slot.array_length,
                    instances: slot.instances.iter().map(Protocol::instance).collect(),
                })
                .collect(),
            names: self.names.clone(),
            enum_registry: self.enum_registry.clone(),
        }
    }

    /// Current value of a scalar field or bit-field member.
    pub fn value(&self, name: &str) -> Result<PrimitiveValue> {
        match self.names.get(name) {
            Some(Slot::BitField { .. }) => Ok(self.bit_field(name)?.value()),
            _ => Ok(self.get_primitive(name, None)?.value()),
        }
    }

    /// Assign a scalar field or bit-field member (range-checked).
    pub fn set_value(&self, name: &str, value: impl Into<PrimitiveValue>) -> Result<()> {
        match self.names.get(name) {
            Some(Slot::BitField { .. }) => self.bit_field(name)?.set(value)?,
            _ => self.get_primitive(name, None)?.set(value)?,
        }
        Ok(())
    }

    /// Resolve an enumerated field's current value to its symbolic key.
    pub fn value_symbolic(&self, name: &str) -> Result<String> {
        let definition = self.enum_for(name)?;
        let value = self.value(name)?;
        definition.key_for(value).map(str::to_string)
    }

    /// Assign an enumerated field by symbolic key.
    pub fn set_symbolic(&self, name: &str, key: &str) -> Result<()> {
        let definition = self.enum_for(name)?;
        let value = definition
            .get_value(key)
            .ok_or_else(|| ProtocolError::UnknownEnumKey {
                name: definition.name().to_string(),
                key: key.to_string(),
            })?;
        self.set_value(name, value)
    }

    fn enum_for(&self, name: &str) -> Result<&Arc<EnumDef>> {
        let enum_name = match self.names.get(name) {
            Some(Slot::Field(index)) => self.fields[*index].spec.enum_name.as_deref(),
            Some(Slot::BitField { group, member }) => self.bit_fields[*group].fields()[*member]
                .spec()
                .enum_name
                .as_deref(),
            Some(_) => None,
            None => return Err(ProtocolError::UnknownField(name.to_string())),
        };
        let enum_name = enum_name.ok_or_else(|| ProtocolError::NotEnumerated(name.to_string()))?;
        self.enum_registry.require(enum_name)
    }

    /// An owned copy of every leaf value, keyed by its flattened path.
    ///
    /// Paths follow the channel projection rules: array elements and
    /// nested struct fields are joined with `.`, bit-field members sit at
    /// the level of their group.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_with_delimiter(".")
    }

    /// Like [`Protocol::snapshot`], joining path segments with `delimiter`
    /// so paths line up with channels projected under a custom delimiter.
    pub fn snapshot_with_delimiter(&self, delimiter: &str) -> Snapshot {
        let mut values = Vec::new();
        let mut timestamp_ns = 0;
        let mut walk = LeafWalk {
            delimiter,
            prefix: Vec::new(),
            out: &mut values,
            timestamp_ns: &mut timestamp_ns,
        };
        self.collect_leaves(&mut walk);
        Snapshot {
            name: self.name.clone(),
            id: self.id,
            timestamp_ns,
            values,
        }
    }

    fn collect_leaves(&self, walk: &mut LeafWalk<'_>) {
        for entry in &self.build {
            match *entry {
                Entry::Field(index) => {
                    let slot = &self.fields[index];
                    if slot.spec.is_array() {
                        walk.prefix.push(slot.spec.name.clone());
                        for (element, holder) in slot.elements.iter().enumerate() {
                            walk.touch(holder.timestamp_ns());
                            walk.leaf(&element.to_string(), holder.value());
                        }
                        walk.prefix.pop();
                    } else {
                        let holder = &slot.elements[0];
                        walk.touch(holder.timestamp_ns());
                        walk.leaf(&slot.spec.name, holder.value());
                    }
                }
                Entry::BitFields(id) => {
                    let group = &self.bit_fields[id];
                    walk.touch(group.parent().timestamp_ns());
                    for field in group.fields() {
                        walk.leaf(field.name(), field.value());
                    }
                }
                Entry::Nested(index) => {
                    let slot = &self.nested[index];
                    walk.prefix.push(slot.name.clone());
                    // A one-element array flattens like a plain nested struct.
                    let indexed = slot.instances.len() > 1;
                    for (element, instance) in slot.instances.iter().enumerate() {
                        if indexed {
                            walk.prefix.push(element.to_string());
                        }
                        instance.collect_leaves(walk);
                        if indexed {
                            walk.prefix.pop();
                        }
                    }
                    walk.prefix.pop();
                }
            }
        }
    }
}

struct LeafWalk<'a> {
    delimiter: &'a str,
    prefix: Vec<String>,
    out: &'a mut Vec<SnapshotEntry>,
    timestamp_ns: &'a mut u64,
}

impl LeafWalk<'_> {
    fn touch(&mut self, timestamp_ns: u64) {
        *self.timestamp_ns = (*self.timestamp_ns).max(timestamp_ns);
    }

    fn leaf(&mut self, name: &str, value: PrimitiveValue) {
        let mut path = self.prefix.join(self.delimiter);
        if !path.is_empty() {
            path.push_str(self.delimiter);
        }
        path.push_str(name);
        self.out.push(SnapshotEntry { path, value });
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}
