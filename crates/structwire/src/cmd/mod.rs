use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use structwire_protocol::{Protocol, SchemaDefinition};

use crate::exit::{io_error, protocol_error, CliResult};
use crate::output::OutputFormat;

pub mod channels;
pub mod decode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the channels every identified protocol projects to.
    Channels(ChannelsArgs),
    /// Decode a buffer of framed messages.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Channels(args) => channels::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// JSON schema definition file.
    pub schema: PathBuf,
    /// Only list channels whose name contains this text.
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["hex", "input"])))]
pub struct DecodeArgs {
    /// JSON schema definition file.
    pub schema: PathBuf,
    /// Buffer as hex digits (whitespace and a leading 0x are ignored).
    #[arg(long, conflicts_with = "input")]
    pub hex: Option<String>,
    /// Read the buffer from a binary file.
    #[arg(long, value_name = "FILE", conflicts_with = "hex")]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Build every protocol in a schema definition file, in document order.
pub fn load_protocols(path: &Path) -> CliResult<Vec<Protocol>> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    SchemaDefinition::from_json_str(&content)
        .and_then(|definition| definition.build())
        .map_err(|err| protocol_error(&format!("invalid schema {}", path.display()), err))
}
