//! Decode a stream of telemetry structs and read them back as channels.
//!
//! Run with: `cargo run -p structwire --example telemetry`

use structwire::env::ChannelEnvironment;
use structwire::protocol::{
    BitFieldSpec, EnumDef, FieldSpec, PrimitiveKind, Protocol, ProtocolFactory,
};
use structwire::receiver::StructReceiver;

struct Battery;

impl ProtocolFactory for Battery {
    fn build() -> structwire::protocol::Result<Protocol> {
        let mut protocol = Protocol::new("battery", 0x10);
        protocol.register_enum(EnumDef::new(
            "ChargeState",
            [("idle", 0), ("charging", 1), ("discharging", 2)],
        )?)?;
        protocol.add_field(FieldSpec::new("millivolts", PrimitiveKind::U16))?;
        protocol.add_field(FieldSpec::new("cells", PrimitiveKind::U16).with_array_length(4))?;
        protocol.add_bit_fields(
            "status",
            PrimitiveKind::U8,
            vec![
                BitFieldSpec::new("state", 0, 2).with_enum("ChargeState"),
                BitFieldSpec::new("balancing", 2, 1).with_commandable(true),
            ],
        )?;
        Ok(protocol)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut receiver = StructReceiver::new();
    let battery = receiver.register_factory::<Battery>()?;
    receiver.add_handler(0x10, |protocol| {
        println!("{} snapshot: {:?}", protocol, protocol.snapshot().values);
    })?;

    let mut env = ChannelEnvironment::new();
    env.with_namespace("pack", |env| env.register_protocol(&battery))?;

    // Two battery messages back to back, as one transport delivery.
    let mut buffer = Vec::new();
    for (millivolts, state) in [(14_800u16, 1u8), (14_750, 2)] {
        buffer.extend_from_slice(&0x10u16.to_be_bytes());
        buffer.extend_from_slice(&millivolts.to_be_bytes());
        for cell in 0..4u16 {
            buffer.extend_from_slice(&(3_700 + cell).to_be_bytes());
        }
        buffer.push(state | 0b100);
    }

    let disposition = receiver.process(&buffer);
    println!("disposition: {disposition:?}, stats: {:?}", receiver.stats());

    for name in env.names() {
        println!("{name} = {}", env.value(name)?);
    }
    println!("pack.state = {}", env.value_symbolic("pack.state")?);

    env.command("pack.balancing", false)?;
    println!("encoded: {:02x?}", battery.encode_message()?.as_ref());
    Ok(())
}
