/// Errors that can occur while building or using a channel environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// Schema-level error (unknown or conflicting enum, bad field access).
    #[error("protocol error: {0}")]
    Protocol(#[from] structwire_protocol::ProtocolError),

    /// Value assignment error.
    #[error("primitive error: {0}")]
    Primitive(#[from] structwire_primitives::PrimitiveError),

    /// The name is already bound to a different value source.
    #[error("channel '{0}' already exists")]
    DuplicateChannelName(String),

    /// No channel with this name exists.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// The channel is read-only.
    #[error("channel '{0}' is not commandable")]
    NotCommandable(String),
}

pub type Result<T> = std::result::Result<T, EnvError>;
