use std::collections::HashMap;
use std::sync::Arc;

use structwire_primitives::PrimitiveValue;
use structwire_protocol::{EnumDef, EnumRegistry, Protocol, ProtocolError};
use tracing::{debug, trace};

use crate::channel::{Channel, ChannelId, ChannelSource};
use crate::config::EnvironmentConfig;
use crate::error::{EnvError, Result};
use crate::projector::{self, ChannelRegistry};

/// An in-memory channel registry with its enums.
///
/// Channels keep their creation order. Names created while inside
/// [`ChannelEnvironment::with_namespace`] are prefixed with every active
/// namespace segment.
#[derive(Debug, Default)]
pub struct ChannelEnvironment {
    config: EnvironmentConfig,
    namespace: Vec<String>,
    channels: Vec<Channel>,
    names: HashMap<String, ChannelId>,
    enums: EnumRegistry,
}

impl ChannelEnvironment {
    /// Create an empty environment with default config.
    pub fn new() -> Self {
        Self::with_config(EnvironmentConfig::default())
    }

    /// Create an empty environment with explicit config.
    pub fn with_config(config: EnvironmentConfig) -> Self {
        Self {
            config,
            namespace: Vec::new(),
            channels: Vec::new(),
            names: HashMap::new(),
            enums: EnumRegistry::new(),
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Run `f` with `name` pushed as an extra namespace segment.
    pub fn with_namespace<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.namespace.push(name.to_string());
        let result = f(self);
        self.namespace.pop();
        result
    }

    /// Project every leaf of `protocol` as a channel under the current namespace.
    ///
    /// Registering the same protocol instance again is a no-op.
    pub fn register_protocol(&mut self, protocol: &Protocol) -> Result<()> {
        let before = self.channels.len();
        projector::register_protocol(self, protocol)?;
        debug!(
            protocol = protocol.name(),
            namespace = %self.namespace.join(&self.config.delimiter),
            created = self.channels.len() - before,
            "registered protocol channels"
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.names.get(name).map(|id| &self.channels[*id])
    }

    /// Look up a channel, failing with `UnknownChannel` when absent.
    pub fn require(&self, name: &str) -> Result<&Channel> {
        self.get(name)
            .ok_or_else(|| EnvError::UnknownChannel(name.to_string()))
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Channels in creation order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(Channel::name)
    }

    /// Names equal to `pattern` when `exact`, otherwise containing it.
    pub fn search_names<'a>(
        &'a self,
        pattern: &'a str,
        exact: bool,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.names().filter(move |name| {
            if exact {
                *name == pattern
            } else {
                name.contains(pattern)
            }
        })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn enums(&self) -> &EnumRegistry {
        &self.enums
    }

    /// Current value of a channel.
    pub fn value(&self, name: &str) -> Result<PrimitiveValue> {
        Ok(self.require(name)?.value())
    }

    /// Current value of an enumerated channel as its symbolic key.
    pub fn value_symbolic(&self, name: &str) -> Result<String> {
        let channel = self.require(name)?;
        let enum_name = channel
            .enum_name()
            .ok_or_else(|| ProtocolError::NotEnumerated(name.to_string()))?;
        let definition = self.enums.require(enum_name)?;
        let key = definition.key_for(channel.value())?;
        Ok(key.to_string())
    }

    /// Write a commandable channel's live value.
    pub fn command(&self, name: &str, value: impl Into<PrimitiveValue>) -> Result<()> {
        let channel = self.require(name)?;
        if !channel.commandable() {
            return Err(EnvError::NotCommandable(name.to_string()));
        }
        channel.source().set(value.into())?;
        trace!(channel = name, "commanded channel");
        Ok(())
    }

    /// Command an enumerated channel by symbolic key.
    pub fn command_symbolic(&self, name: &str, key: &str) -> Result<()> {
        let channel = self.require(name)?;
        let enum_name = channel
            .enum_name()
            .ok_or_else(|| ProtocolError::NotEnumerated(name.to_string()))?;
        let value = self
            .enums
            .require(enum_name)?
            .get_value(key)
            .ok_or_else(|| ProtocolError::UnknownEnumKey {
                name: enum_name.to_string(),
                key: key.to_string(),
            })?;
        self.command(name, value)
    }

    /// Record a default value for a channel.
    ///
    /// The value must be representable by the channel's kind.
    pub fn set_default(&mut self, name: &str, value: impl Into<PrimitiveValue>) -> Result<()> {
        let value = value.into();
        let id = *self
            .names
            .get(name)
            .ok_or_else(|| EnvError::UnknownChannel(name.to_string()))?;
        let channel = &mut self.channels[id];
        channel.kind().to_bits(value)?;
        channel.default = Some(value);
        Ok(())
    }

    /// Number of channels with a default value.
    pub fn num_defaults(&self) -> usize {
        self.channels.iter().filter(|c| c.has_default()).count()
    }

    fn qualified(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            return name.to_string();
        }
        let delimiter = &self.config.delimiter;
        let mut qualified = self.namespace.join(delimiter);
        qualified.push_str(delimiter);
        qualified.push_str(name);
        qualified
    }
}

impl ChannelRegistry for ChannelEnvironment {
    fn delimiter(&self) -> &str {
        &self.config.delimiter
    }

    fn create_enum(&mut self, definition: Arc<EnumDef>) -> Result<()> {
        Ok(self.enums.register(definition)?)
    }

    /// Reuses an existing channel bound to the same live source; a name
    /// bound to a different source fails with `DuplicateChannelName`.
    fn create_channel(
        &mut self,
        name: &str,
        source: ChannelSource,
        commandable: bool,
        enum_name: Option<&str>,
    ) -> Result<ChannelId> {
        let name = self.qualified(name);
        if let Some(id) = self.names.get(&name) {
            let existing = &self.channels[*id];
            if existing.source.same_source(&source) {
                return Ok(*id);
            }
            return Err(EnvError::DuplicateChannelName(name));
        }
        if let Some(enum_name) = enum_name {
            self.enums.require(enum_name)?;
        }

        let id = self.channels.len();
        trace!(channel = %name, id, kind = %source.kind(), "created channel");
        self.names.insert(name.clone(), id);
        self.channels.push(Channel {
            id,
            name,
            source,
            commandable,
            enum_name: enum_name.map(str::to_string),
            default: None,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use structwire_primitives::{Primitive, PrimitiveKind};
    use structwire_protocol::FieldSpec;

    use super::*;

    fn mode() -> EnumDef {
        EnumDef::new("Mode", [("idle", 0), ("run", 1)]).unwrap()
    }

    fn control() -> Protocol {
        let mut protocol = Protocol::new("control", 1);
        protocol.register_enum(mode()).unwrap();
        protocol
            .add_field(
                FieldSpec::new("mode", PrimitiveKind::U8)
                    .with_enum("Mode")
                    .with_commandable(true),
            )
            .unwrap();
        protocol
            .add_field(FieldSpec::new("level", PrimitiveKind::I8))
            .unwrap();
        protocol
    }

    #[test]
    fn namespaces_prefix_created_channels() {
        let mut env = ChannelEnvironment::new();
        let protocol = control();
        env.with_namespace("left", |env| env.register_protocol(&protocol))
            .unwrap();

        assert_eq!(env.names().collect::<Vec<_>>(), vec!["left.mode", "left.level"]);
        assert!(env.get("mode").is_none());
    }

    #[test]
    fn custom_delimiter_is_used() {
        let mut env = ChannelEnvironment::with_config(EnvironmentConfig {
            delimiter: "::".to_string(),
        });
        let protocol = control();
        env.with_namespace("a", |env| {
            env.with_namespace("b", |env| env.register_protocol(&protocol))
        })
        .unwrap();
        assert!(env.get("a::b::mode").is_some());
    }

    #[test]
    fn command_respects_commandable_flag() {
        let mut env = ChannelEnvironment::new();
        let protocol = control();
        env.register_protocol(&protocol).unwrap();

        env.command_symbolic("mode", "run").unwrap();
        assert_eq!(protocol.value("mode").unwrap(), PrimitiveValue::UInt(1));
        assert_eq!(env.value_symbolic("mode").unwrap(), "run");

        assert!(matches!(
            env.command("level", -3i8),
            Err(EnvError::NotCommandable(_))
        ));
        assert!(matches!(
            env.command("mode", 300u16),
            Err(EnvError::Primitive(_))
        ));
        assert!(matches!(
            env.value("missing"),
            Err(EnvError::UnknownChannel(_))
        ));
    }

    #[test]
    fn value_symbolic_requires_an_enum() {
        let mut env = ChannelEnvironment::new();
        env.register_protocol(&control()).unwrap();
        assert!(matches!(
            env.value_symbolic("level"),
            Err(EnvError::Protocol(ProtocolError::NotEnumerated(_)))
        ));
    }

    #[test]
    fn defaults_are_range_checked_and_counted() {
        let mut env = ChannelEnvironment::new();
        env.register_protocol(&control()).unwrap();

        env.set_default("level", -5i8).unwrap();
        assert!(env.set_default("mode", -1i8).is_err());
        assert!(matches!(
            env.set_default("nope", 0u8),
            Err(EnvError::UnknownChannel(_))
        ));

        assert_eq!(env.num_defaults(), 1);
        assert_eq!(env.get("level").unwrap().default(), Some(PrimitiveValue::Int(-5)));
    }

    #[test]
    fn search_names_matches_substrings_or_exact_names() {
        let mut env = ChannelEnvironment::new();
        let protocol = control();
        env.with_namespace("left", |env| env.register_protocol(&protocol))
            .unwrap();

        assert_eq!(env.search_names("mode", false).collect::<Vec<_>>(), vec!["left.mode"]);
        assert_eq!(env.search_names("mode", true).count(), 0);
        assert_eq!(env.search_names("left.level", true).count(), 1);
    }

    #[test]
    fn conflicting_enum_is_rejected() {
        let mut env = ChannelEnvironment::new();
        env.create_enum(Arc::new(EnumDef::new("Mode", [("off", 0)]).unwrap()))
            .unwrap();
        assert!(matches!(
            env.register_protocol(&control()),
            Err(EnvError::Protocol(ProtocolError::ConflictingDefinition(_)))
        ));
    }

    #[test]
    fn create_channel_checks_enum_and_source() {
        let mut env = ChannelEnvironment::new();
        let holder = Primitive::shared(PrimitiveKind::U8);

        assert!(matches!(
            env.create_channel("x", ChannelSource::Primitive(Arc::clone(&holder)), false, Some("Nope")),
            Err(EnvError::Protocol(ProtocolError::UnknownEnum(_)))
        ));

        let id = env
            .create_channel("x", ChannelSource::Primitive(Arc::clone(&holder)), false, None)
            .unwrap();
        let again = env
            .create_channel("x", ChannelSource::Primitive(holder), false, None)
            .unwrap();
        assert_eq!(id, again);
        assert_eq!(env.channel(id).unwrap().name(), "x");

        let other = Primitive::shared(PrimitiveKind::U8);
        assert!(matches!(
            env.create_channel("x", ChannelSource::Primitive(other), false, None),
            Err(EnvError::DuplicateChannelName(name)) if name == "x"
        ));
    }
}
