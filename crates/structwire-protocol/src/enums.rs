use std::collections::BTreeMap;
use std::sync::Arc;

use structwire_primitives::PrimitiveValue;
use tracing::debug;

use crate::error::{ProtocolError, Result};

/// A named, bijective mapping between symbolic keys and integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    values: BTreeMap<String, i64>,
    keys: BTreeMap<i64, String>,
}

impl EnumDef {
    /// Create an enum from `(key, value)` pairs.
    ///
    /// Fails with `InvalidEnum` if a key or a value appears twice.
    pub fn new<I, K>(name: impl Into<String>, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let name = name.into();
        let mut values = BTreeMap::new();
        let mut keys = BTreeMap::new();

        for (key, value) in items {
            let key = key.into();
            if let Some(existing) = keys.get(&value) {
                return Err(ProtocolError::InvalidEnum {
                    name,
                    reason: format!("value {value} used by both '{existing}' and '{key}'"),
                });
            }
            if values.insert(key.clone(), value).is_some() {
                return Err(ProtocolError::InvalidEnum {
                    name,
                    reason: format!("duplicate key '{key}'"),
                });
            }
            keys.insert(value, key);
        }

        Ok(Self { name, values, keys })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key → value domain, sorted by key.
    pub fn domain(&self) -> &BTreeMap<String, i64> {
        &self.values
    }

    pub fn get_value(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    /// Resolve an integer to its symbolic key.
    pub fn get_key(&self, value: i64) -> Result<&str> {
        self.key_for_wide(i128::from(value))
    }

    /// Symbolic key for a decoded value. Unsigned values beyond `i64` are
    /// reported in full; fractional floats never match a key.
    pub fn key_for(&self, value: PrimitiveValue) -> Result<&str> {
        let wide = match value {
            PrimitiveValue::Bool(flag) => i128::from(flag),
            PrimitiveValue::Int(int) => i128::from(int),
            PrimitiveValue::UInt(int) => i128::from(int),
            PrimitiveValue::Float(float) if float.fract() == 0.0 => float as i128,
            PrimitiveValue::Float(float) => {
                return Err(ProtocolError::UnknownEnumValue {
                    name: self.name.clone(),
                    value: float as i128,
                })
            }
        };
        self.key_for_wide(wide)
    }

    fn key_for_wide(&self, value: i128) -> Result<&str> {
        i64::try_from(value)
            .ok()
            .and_then(|narrow| self.keys.get(&narrow))
            .map(String::as_str)
            .ok_or_else(|| ProtocolError::UnknownEnumValue {
                name: self.name.clone(),
                value,
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Name-keyed registry of enums.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    enums: BTreeMap<String, Arc<EnumDef>>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enum.
    ///
    /// Re-registering an identical domain under the same name is a no-op;
    /// a different domain fails with `ConflictingDefinition`.
    pub fn register(&mut self, definition: impl Into<Arc<EnumDef>>) -> Result<()> {
        let definition = definition.into();
        match self.enums.get(definition.name()) {
            Some(existing) if existing.domain() == definition.domain() => Ok(()),
            Some(_) => Err(ProtocolError::ConflictingDefinition(
                definition.name().to_string(),
            )),
            None => {
                debug!(name = definition.name(), items = definition.len(), "registered enum");
                self.enums.insert(definition.name().to_string(), definition);
                Ok(())
            }
        }
    }

    /// Register every enum of `other`. Idempotent.
    pub fn register_from_other(&mut self, other: &EnumRegistry) -> Result<()> {
        for definition in other.enums.values() {
            self.register(Arc::clone(definition))?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EnumDef>> {
        self.enums.get(name)
    }

    /// Look up an enum, failing with `UnknownEnum` when absent.
    pub fn require(&self, name: &str) -> Result<&Arc<EnumDef>> {
        self.get(name)
            .ok_or_else(|| ProtocolError::UnknownEnum(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }

    /// Registered enum names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.enums.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EnumDef>> {
        self.enums.values()
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }
}
