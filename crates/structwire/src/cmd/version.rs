use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("structwire {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("STRUCTWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("host_os: {}", std::env::consts::OS);
    println!(
        "features: receiver={}, env={}, cli=true",
        cfg!(feature = "receiver"),
        cfg!(feature = "env")
    );
    println!(
        "primitive kinds: {}",
        structwire_primitives::PrimitiveKind::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(SUCCESS)
}
