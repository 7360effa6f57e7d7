//! Named channels over live struct fields.
//!
//! [`register_protocol`] walks a [`structwire_protocol::Protocol`] and
//! creates one channel per leaf value in any [`ChannelRegistry`]. Channel
//! names are hierarchical paths: array elements and nested structs add a
//! segment, bit-field members sit beside their group's siblings.
//! [`ChannelEnvironment`] is the in-memory registry.

pub mod channel;
pub mod config;
pub mod environment;
pub mod error;
pub mod projector;

pub use channel::{Channel, ChannelId, ChannelSource};
pub use config::{EnvironmentConfig, DEFAULT_DELIMITER};
pub use environment::ChannelEnvironment;
pub use error::{EnvError, Result};
pub use projector::{register_protocol, ChannelRegistry};
