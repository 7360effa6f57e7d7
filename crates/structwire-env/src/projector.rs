use std::sync::Arc;

use structwire_protocol::{BuildItem, EnumDef, Protocol};

use crate::channel::{ChannelId, ChannelSource};
use crate::error::Result;

/// The registry operations a protocol projection needs.
pub trait ChannelRegistry {
    /// Separator between path segments.
    fn delimiter(&self) -> &str;

    /// Make an enum available to channels created afterwards.
    fn create_enum(&mut self, definition: Arc<EnumDef>) -> Result<()>;

    /// Bind `name` to a live value.
    fn create_channel(
        &mut self,
        name: &str,
        source: ChannelSource,
        commandable: bool,
        enum_name: Option<&str>,
    ) -> Result<ChannelId>;
}

/// Create one channel per leaf value of `protocol`, in build order.
///
/// The protocol's enums are registered first. Array elements are named by
/// index under the array's name; nested structs add their field name (and,
/// for arrays of structs, the index) as path segments; bit-field members
/// are created at the current level.
pub fn register_protocol<R>(registry: &mut R, protocol: &Protocol) -> Result<()>
where
    R: ChannelRegistry + ?Sized,
{
    for definition in protocol.enum_registry().iter() {
        registry.create_enum(Arc::clone(definition))?;
    }
    project(registry, protocol, &mut Vec::new())
}

fn project<R>(registry: &mut R, protocol: &Protocol, path: &mut Vec<String>) -> Result<()>
where
    R: ChannelRegistry + ?Sized,
{
    for item in protocol.build() {
        match item {
            BuildItem::Scalar(spec) => {
                let holder = protocol.get_primitive(&spec.name, None)?;
                create(
                    registry,
                    path,
                    &spec.name,
                    ChannelSource::Primitive(Arc::clone(holder)),
                    spec.commandable,
                    spec.enum_name.as_deref(),
                )?;
            }
            BuildItem::Array(spec) => {
                path.push(spec.name.clone());
                for index in 0..spec.element_count() {
                    let holder = protocol.get_primitive(&spec.name, Some(index))?;
                    create(
                        registry,
                        path,
                        &index.to_string(),
                        ChannelSource::Primitive(Arc::clone(holder)),
                        spec.commandable,
                        spec.enum_name.as_deref(),
                    )?;
                }
                path.pop();
            }
            BuildItem::BitFields { group, .. } => {
                for field in group.fields() {
                    create(
                        registry,
                        path,
                        field.name(),
                        ChannelSource::BitField(field.clone()),
                        field.spec().commandable,
                        field.spec().enum_name.as_deref(),
                    )?;
                }
            }
            BuildItem::NestedOne { name, protocol } => {
                path.push(name.to_string());
                project(registry, protocol, path)?;
                path.pop();
            }
            BuildItem::NestedMany { name, protocols } => {
                path.push(name.to_string());
                // A one-element array projects like a plain nested struct.
                let indexed = protocols.len() > 1;
                for (index, nested) in protocols.iter().enumerate() {
                    if indexed {
                        path.push(index.to_string());
                    }
                    project(registry, nested, path)?;
                    if indexed {
                        path.pop();
                    }
                }
                path.pop();
            }
        }
    }
    Ok(())
}

fn create<R>(
    registry: &mut R,
    path: &[String],
    leaf: &str,
    source: ChannelSource,
    commandable: bool,
    enum_name: Option<&str>,
) -> Result<ChannelId>
where
    R: ChannelRegistry + ?Sized,
{
    let delimiter = registry.delimiter();
    let mut name = path.join(delimiter);
    if !name.is_empty() {
        name.push_str(delimiter);
    }
    name.push_str(leaf);
    registry.create_channel(&name, source, commandable, enum_name)
}
