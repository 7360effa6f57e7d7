//! JSON schema-definition documents.
//!
//! A document lists enums and protocols; protocols may nest any protocol
//! defined earlier in the same document:
//!
//! ```json
//! {
//!   "enums": [{ "name": "Mode", "items": { "idle": 0, "run": 1 } }],
//!   "protocols": [
//!     { "name": "Point", "fields": [{ "name": "x", "kind": "float" }] },
//!     {
//!       "name": "Status", "id": 1, "identifier_kind": "uint16", "byte_order": "big",
//!       "fields": [
//!         { "name": "uptime", "kind": "uint32" },
//!         { "name": "samples", "kind": "int16", "array_length": 3 },
//!         { "bit_fields": "flags", "kind": "uint8",
//!           "members": [{ "name": "mode", "offset": 0, "width": 2, "enum": "Mode" }] },
//!         { "nested": "path", "protocol": "Point", "array_length": 2 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use structwire_primitives::{ByteOrder, PrimitiveKind};

use crate::enums::EnumDef;
use crate::error::{ProtocolError, Result};
use crate::field::{BitFieldSpec, FieldSpec};
use crate::protocol::{Protocol, DEFAULT_IDENTIFIER_KIND};

/// A complete schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub enums: Vec<EnumDefinition>,
    #[serde(default)]
    pub protocols: Vec<ProtocolDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDefinition {
    pub name: String,
    /// `0` for protocols only used as nested structs.
    #[serde(default)]
    pub id: u64,
    #[serde(default = "default_identifier_kind")]
    pub identifier_kind: PrimitiveKind,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// One build entry. Distinguished by its keys: `bit_fields`, `nested`,
/// or a plain `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDefinition {
    BitFields {
        bit_fields: String,
        kind: PrimitiveKind,
        members: Vec<BitFieldDefinition>,
    },
    Nested {
        nested: String,
        protocol: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        array_length: Option<usize>,
    },
    Field {
        name: String,
        kind: PrimitiveKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        array_length: Option<usize>,
        #[serde(default)]
        commandable: bool,
        #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitFieldDefinition {
    pub name: String,
    pub offset: u32,
    pub width: u32,
    #[serde(default)]
    pub commandable: bool,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
}

fn default_identifier_kind() -> PrimitiveKind {
    DEFAULT_IDENTIFIER_KIND
}

impl SchemaDefinition {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            ProtocolError::Definition(format!("failed reading {}: {err}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Build every protocol, in document order.
    pub fn build(&self) -> Result<Vec<Protocol>> {
        let mut enums: HashMap<&str, &EnumDefinition> = HashMap::new();
        for definition in &self.enums {
            if enums.insert(&definition.name, definition).is_some() {
                return Err(ProtocolError::Definition(format!(
                    "enum '{}' defined twice",
                    definition.name
                )));
            }
        }

        let mut built: Vec<Protocol> = Vec::with_capacity(self.protocols.len());
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for definition in &self.protocols {
            let mut protocol = Protocol::new(&definition.name, definition.id)
                .with_identifier_kind(definition.identifier_kind)?
                .with_byte_order(definition.byte_order);

            for field in &definition.fields {
                match field {
                    FieldDefinition::Field {
                        name,
                        kind,
                        array_length,
                        commandable,
                        enum_name,
                    } => {
                        let mut spec = FieldSpec::new(name, *kind).with_commandable(*commandable);
                        spec.array_length = *array_length;
                        if let Some(enum_name) = enum_name {
                            ensure_enum(&mut protocol, &enums, enum_name)?;
                            spec = spec.with_enum(enum_name);
                        }
                        protocol.add_field(spec)?;
                    }
                    FieldDefinition::BitFields {
                        bit_fields,
                        kind,
                        members,
                    } => {
                        let mut specs = Vec::with_capacity(members.len());
                        for member in members {
                            let mut spec = BitFieldSpec::new(&member.name, member.offset, member.width)
                                .with_commandable(member.commandable);
                            if let Some(enum_name) = &member.enum_name {
                                ensure_enum(&mut protocol, &enums, enum_name)?;
                                spec = spec.with_enum(enum_name);
                            }
                            specs.push(spec);
                        }
                        protocol.add_bit_fields(bit_fields, *kind, specs)?;
                    }
                    FieldDefinition::Nested {
                        nested,
                        protocol: template,
                        array_length,
                    } => {
                        let index = by_name.get(template.as_str()).ok_or_else(|| {
                            ProtocolError::Definition(format!(
                                "'{}.{nested}' references protocol '{template}' before it is defined",
                                definition.name
                            ))
                        })?;
                        protocol.add_serializable(nested, &built[*index], *array_length)?;
                    }
                }
            }

            if by_name.insert(&definition.name, built.len()).is_some() {
                return Err(ProtocolError::Definition(format!(
                    "protocol '{}' defined twice",
                    definition.name
                )));
            }
            built.push(protocol);
        }

        Ok(built)
    }
}

fn ensure_enum(
    protocol: &mut Protocol,
    enums: &HashMap<&str, &EnumDefinition>,
    name: &str,
) -> Result<()> {
    if protocol.enum_registry().contains(name) {
        return Ok(());
    }
    let definition = enums
        .get(name)
        .ok_or_else(|| ProtocolError::UnknownEnum(name.to_string()))?;
    let items = definition
        .items
        .iter()
        .map(|(key, value)| (key.clone(), *value));
    protocol.register_enum(EnumDef::new(&definition.name, items)?)
}
