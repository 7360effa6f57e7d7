use std::sync::mpsc;

use structwire_receiver::{StructReceiver, NON_STRUCT_ID};
use tracing::info;

use crate::cmd::{load_protocols, DecodeArgs};
use crate::exit::{io_error, receiver_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decode, DecodeReport, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let protocols = load_protocols(&args.schema)?;
    let buffer = read_buffer(&args)?;

    let mut receiver = StructReceiver::new();
    let (messages_tx, messages_rx) = mpsc::channel();
    for protocol in protocols
        .into_iter()
        .filter(|protocol| protocol.id() != NON_STRUCT_ID)
    {
        let id = protocol.id();
        receiver
            .register(protocol)
            .map_err(|err| receiver_error("failed registering protocol", err))?;

        let tx = messages_tx.clone();
        receiver
            .add_handler(id, move |protocol| {
                let _ = tx.send(protocol.snapshot());
            })
            .map_err(|err| receiver_error("failed installing handler", err))?;
    }
    if receiver.identifiers().next().is_none() {
        return Err(CliError::new(
            USAGE,
            format!("{} defines no identified protocols", args.schema.display()),
        ));
    }

    let (payload_tx, payload_rx) = mpsc::channel();
    receiver
        .add_non_struct_handler(move |cursor| {
            let _ = payload_tx.send(hex::encode(*cursor));
            *cursor = &[];
            true
        })
        .map_err(|err| receiver_error("failed installing non-struct handler", err))?;

    let disposition = receiver.process(&buffer);
    info!(bytes = buffer.len(), ?disposition, "processed buffer");

    let report = DecodeReport {
        messages: messages_rx.try_iter().collect(),
        non_struct: payload_rx.try_iter().next(),
        disposition,
        stats: *receiver.stats(),
    };
    print_decode(&report, format);

    if disposition.is_error() {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

fn read_buffer(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.input {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    let text = args.hex.as_deref().unwrap_or_default();
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex buffer: {err}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn hex_args(hex: &str) -> DecodeArgs {
        DecodeArgs {
            schema: PathBuf::from("unused.json"),
            hex: Some(hex.to_string()),
            input: None,
        }
    }

    #[test]
    fn hex_ignores_prefix_and_whitespace() {
        let buffer = read_buffer(&hex_args("0x00 01\n0a ff")).unwrap();
        assert_eq!(buffer, vec![0x00, 0x01, 0x0a, 0xff]);
    }

    #[test]
    fn odd_hex_is_invalid_data() {
        let err = read_buffer(&hex_args("abc")).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
