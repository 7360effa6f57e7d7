use std::fmt;
use std::io;

use structwire_env::EnvError;
use structwire_protocol::ProtocolError;
use structwire_receiver::ReceiverError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Schema problems are problems with the input file.
pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::Primitive(_)
        | ProtocolError::UnknownField(_)
        | ProtocolError::IndexOutOfRange { .. }
        | ProtocolError::NotAnArray(_)
        | ProtocolError::IndexRequired(_)
        | ProtocolError::UnknownBitFieldGroup(_) => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn receiver_error(context: &str, err: ReceiverError) -> CliError {
    match err {
        ReceiverError::Protocol(err) => protocol_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn env_error(context: &str, err: EnvError) -> CliError {
    match err {
        EnvError::Protocol(err) => protocol_error(context, err),
        EnvError::DuplicateChannelName(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        EnvError::UnknownChannel(_) | EnvError::NotCommandable(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}
