use std::sync::{Arc, Mutex};

use structwire_protocol::{
    BitFieldSpec, ByteOrder, FieldSpec, PrimitiveKind, PrimitiveValue, Protocol, ProtocolFactory,
    Snapshot,
};
use structwire_receiver::{AbandonReason, Disposition, ReceiverStats, StructReceiver};

struct Heartbeat;

impl ProtocolFactory for Heartbeat {
    fn build() -> structwire_protocol::Result<Protocol> {
        let mut protocol = Protocol::new("heartbeat", 1);
        protocol.add_field(FieldSpec::new("uptime", PrimitiveKind::U32))?;
        Ok(protocol)
    }
}

struct Power;

impl ProtocolFactory for Power {
    fn build() -> structwire_protocol::Result<Protocol> {
        let mut protocol = Protocol::new("power", 2);
        protocol.add_field(FieldSpec::new("volts", PrimitiveKind::I16).with_array_length(2))?;
        protocol.add_bit_fields(
            "status",
            PrimitiveKind::U8,
            vec![BitFieldSpec::new("on", 0, 1), BitFieldSpec::new("level", 1, 3)],
        )?;
        Ok(protocol)
    }
}

type Log = Arc<Mutex<Vec<Snapshot>>>;

fn receiver_with_log() -> (StructReceiver, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut receiver = StructReceiver::new();
    receiver.register_factory::<Heartbeat>().unwrap();
    receiver.register_factory::<Power>().unwrap();
    for id in [1, 2] {
        let sink = Arc::clone(&log);
        receiver
            .add_handler(id, move |protocol| {
                sink.lock().unwrap().push(protocol.snapshot());
            })
            .unwrap();
    }
    (receiver, log)
}

fn heartbeat(uptime: u32) -> Vec<u8> {
    let mut message = vec![0x00, 0x01];
    message.extend_from_slice(&uptime.to_be_bytes());
    message
}

fn power(volts: [i16; 2], status: u8) -> Vec<u8> {
    let mut message = vec![0x00, 0x02];
    for v in volts {
        message.extend_from_slice(&v.to_be_bytes());
    }
    message.push(status);
    message
}

#[test]
fn consecutive_messages_dispatch_in_arrival_order() {
    let (mut receiver, log) = receiver_with_log();
    let mut buffer = heartbeat(42);
    buffer.extend(power([-5, 1200], 0b0000_1011));

    assert_eq!(receiver.process_at(&buffer, 7), Disposition::Consumed);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].name, "heartbeat");
    assert_eq!(log[0].get("uptime"), Some(PrimitiveValue::UInt(42)));
    assert_eq!(log[0].timestamp_ns, 7);
    assert_eq!(log[1].name, "power");
    assert_eq!(log[1].get("volts.0"), Some(PrimitiveValue::Int(-5)));
    assert_eq!(log[1].get("volts.1"), Some(PrimitiveValue::Int(1200)));
    assert_eq!(log[1].get("on"), Some(PrimitiveValue::Bool(true)));
    assert_eq!(log[1].get("level"), Some(PrimitiveValue::UInt(0b101)));
    assert_eq!(receiver.stats().messages, 2);
}

#[test]
fn unknown_identifier_abandons_the_tail() {
    let (mut receiver, log) = receiver_with_log();
    let mut buffer = heartbeat(1);
    buffer.extend_from_slice(&[0x00, 0x09, 0xDE, 0xAD, 0xBE, 0xEF]);
    buffer.extend(heartbeat(2));

    let outcome = receiver.process(&buffer);

    assert_eq!(outcome, Disposition::Abandoned(AbandonReason::UnknownIdentifier));
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(receiver.stats().unknown_identifier, 1);
    assert_eq!(receiver.stats().abandoned_bytes, 4 + 6);
    assert_eq!(
        receiver.instance(1).unwrap().value("uptime").unwrap(),
        PrimitiveValue::UInt(1)
    );
}

#[test]
fn non_struct_message_always_ends_the_buffer() {
    for succeed in [true, false] {
        let (mut receiver, log) = receiver_with_log();
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&payloads);
        receiver
            .add_non_struct_handler(move |cursor| {
                let data: &[u8] = *cursor;
                let (head, rest) = data.split_at(data.len().min(3));
                sink.lock().unwrap().push(head.to_vec());
                *cursor = rest;
                succeed
            })
            .unwrap();

        let mut buffer = heartbeat(5);
        buffer.extend_from_slice(&[0x00, 0x00, b'a', b'b', b'c']);
        buffer.extend(heartbeat(6));

        let outcome = receiver.process(&buffer);

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(*payloads.lock().unwrap(), vec![b"abc".to_vec()]);
        assert_eq!(
            receiver.instance(1).unwrap().value("uptime").unwrap(),
            PrimitiveValue::UInt(5)
        );
        assert_eq!(receiver.stats().non_struct, 1);
        assert_eq!(receiver.stats().abandoned_bytes, 6);
        if succeed {
            assert_eq!(outcome, Disposition::NonStruct);
            assert_eq!(receiver.stats().non_struct_failed, 0);
        } else {
            assert_eq!(outcome, Disposition::Abandoned(AbandonReason::NonStructFailed));
            assert_eq!(receiver.stats().non_struct_failed, 1);
        }
    }
}

#[test]
fn non_struct_message_without_handler_is_observed() {
    let (mut receiver, _log) = receiver_with_log();
    let outcome = receiver.process(&[0x00, 0x00, 0x01, 0x02]);

    assert_eq!(outcome, Disposition::Abandoned(AbandonReason::NonStructUnhandled));
    assert_eq!(receiver.stats().non_struct_unhandled, 1);
    assert_eq!(receiver.stats().abandoned_bytes, 2);
}

#[test]
fn truncated_body_skips_the_handler_and_keeps_partial_values() {
    let (mut receiver, log) = receiver_with_log();
    let mut buffer = power([3, 4], 0);
    receiver.process(&buffer);
    log.lock().unwrap().clear();

    buffer = power([-1, 9], 0xFF);
    buffer.truncate(2 + 2 + 1);
    let outcome = receiver.process(&buffer);

    assert_eq!(outcome, Disposition::Abandoned(AbandonReason::Truncated));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(receiver.stats().truncated, 1);
    assert_eq!(receiver.stats().abandoned_bytes, 1);

    let power = receiver.instance(2).unwrap();
    assert_eq!(
        power.get_primitive("volts", Some(0)).unwrap().value(),
        PrimitiveValue::Int(-1)
    );
    assert_eq!(
        power.get_primitive("volts", Some(1)).unwrap().value(),
        PrimitiveValue::Int(4)
    );
}

#[test]
fn truncated_identifier_is_observed() {
    let (mut receiver, _log) = receiver_with_log();
    let mut buffer = heartbeat(8);
    buffer.push(0x00);

    let outcome = receiver.process(&buffer);

    assert_eq!(outcome, Disposition::Abandoned(AbandonReason::Truncated));
    assert_eq!(receiver.stats().messages, 1);
    assert_eq!(receiver.stats().truncated, 1);
    assert_eq!(receiver.stats().abandoned_bytes, 1);
}

#[test]
fn unhandled_known_messages_are_counted_and_processing_continues() {
    let mut receiver = StructReceiver::new();
    let heartbeat_instance = receiver.register_factory::<Heartbeat>().unwrap();
    let mut buffer = heartbeat(10);
    buffer.extend(heartbeat(11));

    assert_eq!(receiver.process(&buffer), Disposition::Consumed);
    assert_eq!(
        *receiver.stats(),
        ReceiverStats {
            messages: 2,
            unhandled: 2,
            ..ReceiverStats::default()
        }
    );
    assert_eq!(
        heartbeat_instance.value("uptime").unwrap(),
        PrimitiveValue::UInt(11)
    );
}

#[test]
fn framing_follows_the_registered_schemas() {
    let mut protocol = Protocol::new("tiny", 3)
        .with_identifier_kind(PrimitiveKind::U8)
        .unwrap()
        .with_byte_order(ByteOrder::Little);
    protocol
        .add_field(FieldSpec::new("value", PrimitiveKind::U16))
        .unwrap();

    let mut receiver = StructReceiver::new();
    let tiny = receiver.register(protocol).unwrap();

    assert_eq!(receiver.process(&[0x03, 0x34, 0x12]), Disposition::Consumed);
    assert_eq!(tiny.value("value").unwrap(), PrimitiveValue::UInt(0x1234));
    assert_eq!(receiver.non_struct_prefix().unwrap().as_ref(), &[0x00]);
}

#[test]
fn factory_registration_reuses_the_singleton() {
    let mut receiver = StructReceiver::new();
    let first = receiver.register_factory::<Heartbeat>().unwrap();
    assert!(receiver.register_factory::<Heartbeat>().is_err());
    assert!(Arc::ptr_eq(&first, receiver.instance(1).unwrap()));
}
