use structwire_env::ChannelEnvironment;

use crate::cmd::{load_protocols, ChannelsArgs};
use crate::exit::{env_error, CliResult, SUCCESS};
use crate::output::{print_channels, ChannelRow, OutputFormat};

pub fn run(args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let protocols = load_protocols(&args.schema)?;

    let mut env = ChannelEnvironment::new();
    for protocol in protocols.iter().filter(|protocol| protocol.id() != 0) {
        env.with_namespace(protocol.name(), |env| env.register_protocol(protocol))
            .map_err(|err| env_error(&format!("failed projecting {}", protocol.name()), err))?;
    }

    let pattern = args.filter.as_deref().unwrap_or("");
    let rows: Vec<ChannelRow> = env
        .search_names(pattern, false)
        .filter_map(|name| env.get(name))
        .map(|channel| ChannelRow {
            name: channel.name().to_string(),
            kind: channel.kind().to_string(),
            commandable: channel.commandable(),
            enum_name: channel.enum_name().map(str::to_string),
        })
        .collect();

    print_channels(&rows, format);
    Ok(SUCCESS)
}
