use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use shadowscope::broker::FlowPayload;
use shadowscope::flow::{FlowEvent, Protocol};

#[test]
fn protocol_serializes_as_stable_uppercase_strings() {
    for (protocol, expected) in [
        (Protocol::Tcp, "\"TCP\""),
        (Protocol::Udp, "\"UDP\""),
        (Protocol::Http, "\"HTTP\""),
        (Protocol::Https, "\"HTTPS\""),
        (Protocol::Grpc, "\"GRPC\""),
        (Protocol::Dns, "\"DNS\""),
    ] {
        assert_eq!(serde_json::to_string(&protocol).unwrap(), expected);
        let decoded: Protocol = serde_json::from_str(expected).unwrap();
        assert_eq!(decoded, protocol);
    }
}

#[test]
fn observed_host_coalesces_dpi_metadata() {
    let event = FlowEvent::new("192.168.1.10", 40000, "1.2.3.4", 443, Protocol::Https);
    assert_eq!(event.observed_host(), None);

    let event = event.with_metadata("dns_query", "tunnel.example.com");
    assert_eq!(event.observed_host(), Some("tunnel.example.com"));

    let event = event.with_metadata("sni", "chatgpt.com");
    assert_eq!(event.observed_host(), Some("chatgpt.com"));

    // The HTTP host header takes precedence over SNI and DNS.
    let event = event.with_metadata("host", "api.openai.com");
    assert_eq!(event.observed_host(), Some("api.openai.com"));
}

#[test]
fn raw_payload_normalizes_into_typed_event() {
    let payload = FlowPayload::Raw(
        json!({
            "timestamp": "2026-03-01T10:00:00Z",
            "source_ip": "10.0.0.1",
            "source_port": 51000,
            "destination_ip": "45.33.22.11",
            "destination_port": 6667,
            "protocol": "TCP",
            "bytes_sent": 100,
            "metadata": {"user_agent": "curl/8.0"}
        })
        .as_object()
        .cloned()
        .unwrap(),
    );

    let event = payload.into_event().unwrap();
    assert_eq!(event.source_ip, "10.0.0.1");
    assert_eq!(event.destination_port, 6667);
    assert_eq!(event.protocol, Protocol::Tcp);
    assert_eq!(event.bytes_sent, 100);
    assert_eq!(event.bytes_received, 0);
    assert_eq!(event.metadata.get("user_agent").map(String::as_str), Some("curl/8.0"));
}

#[test]
fn malformed_raw_payload_surfaces_a_parse_error() {
    let payload = FlowPayload::Raw(
        json!({"source_ip": "10.0.0.1", "not_a_field": true})
            .as_object()
            .cloned()
            .unwrap(),
    );
    assert!(payload.into_event().is_err());
}

fn ip_strategy() -> impl Strategy<Value = String> {
    (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

fn protocol_strategy() -> impl Strategy<Value = Protocol> {
    prop_oneof![
        Just(Protocol::Tcp),
        Just(Protocol::Udp),
        Just(Protocol::Http),
        Just(Protocol::Https),
        Just(Protocol::Grpc),
        Just(Protocol::Dns),
    ]
}

fn event_strategy() -> impl Strategy<Value = FlowEvent> {
    (
        ip_strategy(),
        any::<u16>(),
        ip_strategy(),
        any::<u16>(),
        protocol_strategy(),
        any::<u32>(),
        any::<u32>(),
        prop::option::of("[a-zA-Z0-9 ]{0,64}"),
        prop::collection::hash_map("[a-z_]{1,12}", "[a-zA-Z0-9\\.-]{0,32}", 0..4),
    )
        .prop_map(
            |(src, sport, dst, dport, protocol, sent, received, payload, metadata)| {
                let mut event = FlowEvent::new(src, sport, dst, dport, protocol)
                    .with_bytes(u64::from(sent), u64::from(received))
                    // Pin the timestamp to whole seconds so JSON round-trips
                    // compare exactly.
                    .with_timestamp(Utc.timestamp_opt(1_767_225_600, 0).unwrap());
                if let Some(sample) = payload {
                    event = event.with_payload(sample);
                }
                for (key, value) in metadata {
                    event = event.with_metadata(key, value);
                }
                event
            },
        )
}

proptest! {
    #[test]
    fn flow_event_serialization_roundtrip(event in event_strategy()) {
        let json = serde_json::to_string(&event).expect("serialize");
        let decoded: FlowEvent = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn typed_payload_roundtrip_preserves_all_fields(event in event_strategy()) {
        let payload = FlowPayload::Typed(event.clone());
        let json = serde_json::to_string(&payload).expect("serialize");
        let decoded: FlowPayload = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(decoded.into_event().expect("normalize"), event);
    }
}
