use structwire_env::{ChannelEnvironment, EnvError, EnvironmentConfig};
use structwire_protocol::{
    BitFieldSpec, EnumDef, FieldSpec, PrimitiveKind, PrimitiveValue, Protocol,
};

fn vector() -> Protocol {
    let mut protocol = Protocol::new("vector", 0);
    protocol
        .add_field(FieldSpec::new("x", PrimitiveKind::F32))
        .unwrap();
    protocol
        .add_field(FieldSpec::new("y", PrimitiveKind::F32))
        .unwrap();
    protocol
}

fn vehicle() -> Protocol {
    let mut protocol = Protocol::new("vehicle", 1);
    protocol
        .register_enum(EnumDef::new("Gear", [("park", 0), ("drive", 1), ("reverse", 2)]).unwrap())
        .unwrap();
    protocol
        .add_field(FieldSpec::new("speed", PrimitiveKind::U16))
        .unwrap();
    protocol
        .add_bit_fields(
            "flags",
            PrimitiveKind::U8,
            vec![
                BitFieldSpec::new("gear", 0, 2).with_enum("Gear").with_commandable(true),
                BitFieldSpec::new("lights", 2, 1).with_commandable(true),
            ],
        )
        .unwrap();
    protocol
        .add_serializable("position", &vector(), None)
        .unwrap();
    protocol
        .add_serializable("wheels", &vector(), Some(2))
        .unwrap();
    protocol
}

#[test]
fn array_elements_are_indexed_without_a_parent_channel() {
    let mut protocol = Protocol::new("sensors", 1);
    protocol
        .add_field(FieldSpec::new("sensor", PrimitiveKind::I16).with_array_length(3))
        .unwrap();

    let mut env = ChannelEnvironment::new();
    env.register_protocol(&protocol).unwrap();

    assert_eq!(
        env.names().collect::<Vec<_>>(),
        vec!["sensor.0", "sensor.1", "sensor.2"]
    );
    assert!(env.get("sensor").is_none());
}

#[test]
fn nested_structs_and_bit_fields_follow_path_rules() {
    let mut env = ChannelEnvironment::new();
    env.register_protocol(&vehicle()).unwrap();

    assert_eq!(
        env.names().collect::<Vec<_>>(),
        vec![
            "speed",
            "gear",
            "lights",
            "position.x",
            "position.y",
            "wheels.0.x",
            "wheels.0.y",
            "wheels.1.x",
            "wheels.1.y",
        ]
    );
    assert!(env.enums().contains("Gear"));
    assert_eq!(env.get("gear").unwrap().enum_name(), Some("Gear"));
    assert_eq!(env.get("lights").unwrap().kind(), PrimitiveKind::Bool);
}

#[test]
fn registering_the_same_protocol_twice_is_idempotent() {
    let protocol = vehicle();
    let mut env = ChannelEnvironment::new();
    env.register_protocol(&protocol).unwrap();
    let count = env.len();

    env.register_protocol(&protocol).unwrap();
    assert_eq!(env.len(), count);
}

#[test]
fn a_different_instance_under_the_same_names_collides() {
    let mut env = ChannelEnvironment::new();
    env.register_protocol(&vehicle()).unwrap();

    let err = env.register_protocol(&vehicle()).unwrap_err();
    assert!(matches!(err, EnvError::DuplicateChannelName(name) if name == "speed"));
}

#[test]
fn namespaces_keep_instances_apart() {
    let mut env = ChannelEnvironment::new();
    for name in ["front", "rear"] {
        let protocol = vehicle();
        env.with_namespace(name, |env| env.register_protocol(&protocol))
            .unwrap();
    }
    assert_eq!(env.len(), 18);
    assert!(env.get("rear.wheels.1.y").is_some());
}

#[test]
fn channels_track_decoded_values() {
    let protocol = vehicle();
    let mut env = ChannelEnvironment::new();
    env.register_protocol(&protocol).unwrap();

    // speed 0x0102, flags 0b110, position (1.0, 0.0), wheels zeroed
    let mut body = vec![0x01, 0x02, 0b0000_0110];
    body.extend_from_slice(&1.0f32.to_be_bytes());
    body.extend_from_slice(&[0; 4 + 16]);
    protocol.from_stream(&mut body.as_slice(), 5).unwrap();

    assert_eq!(env.value("speed").unwrap(), PrimitiveValue::UInt(0x0102));
    assert_eq!(env.value_symbolic("gear").unwrap(), "reverse");
    assert_eq!(env.value("lights").unwrap(), PrimitiveValue::Bool(true));
    assert_eq!(env.value("position.x").unwrap(), PrimitiveValue::Float(1.0));
    assert_eq!(env.get("speed").unwrap().source().timestamp_ns(), 5);

    env.command_symbolic("gear", "park").unwrap();
    env.command("lights", false).unwrap();
    assert_eq!(protocol.get_primitive("flags", None).unwrap().raw(), 0);
}

#[test]
fn a_one_element_struct_array_projects_without_an_index() {
    let mut inner = Protocol::new("inner", 0);
    inner
        .add_field(FieldSpec::new("v", PrimitiveKind::U8))
        .unwrap();
    let mut outer = Protocol::new("outer", 1);
    outer.add_serializable("child", &inner, Some(1)).unwrap();

    let mut env = ChannelEnvironment::new();
    env.register_protocol(&outer).unwrap();

    assert_eq!(env.names().collect::<Vec<_>>(), vec!["child.v"]);
    let snapshot = outer.snapshot();
    assert_eq!(snapshot.paths().collect::<Vec<_>>(), vec!["child.v"]);
}

#[test]
fn snapshot_paths_match_channels_under_a_custom_delimiter() {
    let protocol = vehicle();
    let mut env = ChannelEnvironment::with_config(EnvironmentConfig {
        delimiter: "::".to_string(),
    });
    env.register_protocol(&protocol).unwrap();

    let snapshot = protocol.snapshot_with_delimiter("::");
    assert_eq!(
        snapshot.paths().collect::<Vec<_>>(),
        env.names().collect::<Vec<_>>()
    );
    assert!(env.get("wheels::1::y").is_some());
}

#[test]
fn unmapped_wide_enum_values_are_reported_in_full() {
    let mut protocol = Protocol::new("wide", 1);
    protocol
        .register_enum(EnumDef::new("Code", [("ok", 0), ("err", 1)]).unwrap())
        .unwrap();
    protocol
        .add_field(FieldSpec::new("code", PrimitiveKind::U64).with_enum("Code"))
        .unwrap();
    protocol.set_value("code", u64::MAX).unwrap();

    let mut env = ChannelEnvironment::new();
    env.register_protocol(&protocol).unwrap();

    let err = env.value_symbolic("code").unwrap_err();
    assert!(matches!(
        err,
        EnvError::Protocol(structwire_protocol::ProtocolError::UnknownEnumValue { value, .. })
            if value == i128::from(u64::MAX)
    ));
}
