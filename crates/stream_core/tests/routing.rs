use serde_json::json;
use stream_core::payload::{AgentActivity, PortfolioSnapshot, Signal, Trade};
use stream_core::{decode_envelope, route_frame, ChannelError, DecodeError, EventKind, Routed};

#[test]
fn subscribed_kind_is_forwarded_as_payload() {
    let routed = route_frame(
        r#"{"type":"signal","data":{"symbol":"AAPL","action":"BUY"}}"#,
        &EventKind::Signal,
    );

    assert_eq!(
        routed,
        Routed::Payload(json!({"symbol": "AAPL", "action": "BUY"}))
    );
}

#[test]
fn other_kinds_are_ignored() {
    let routed = route_frame(r#"{"type":"trade","data":{}}"#, &EventKind::Signal);
    assert_eq!(routed, Routed::Ignored(EventKind::Trade));

    let routed = route_frame(r#"{"type":"heartbeat_v2","data":{}}"#, &EventKind::Signal);
    assert_eq!(
        routed,
        Routed::Ignored(EventKind::Other("heartbeat_v2".to_string()))
    );
}

#[test]
fn error_kind_is_surfaced_for_every_subscriber() {
    let routed = route_frame(
        r#"{"type":"error","data":{"message":"portfolio not found"}}"#,
        &EventKind::Trade,
    );
    assert_eq!(
        routed,
        Routed::ServerError(ChannelError::Server("portfolio not found".to_string()))
    );

    let routed = route_frame(r#"{"type":"error","data":"boom"}"#, &EventKind::Trade);
    assert_eq!(
        routed,
        Routed::ServerError(ChannelError::Server("boom".to_string()))
    );

    let routed = route_frame(r#"{"type":"error"}"#, &EventKind::Trade);
    assert!(matches!(routed, Routed::ServerError(ChannelError::Server(_))));
}

#[test]
fn malformed_frames_are_reported() {
    assert!(matches!(
        route_frame("not json", &EventKind::Signal),
        Routed::Malformed(DecodeError::InvalidJson(_))
    ));
    assert!(matches!(
        route_frame(r#"{"data":{}}"#, &EventKind::Signal),
        Routed::Malformed(DecodeError::InvalidEnvelope(_))
    ));
    assert!(matches!(
        route_frame(r#"[1,2,3]"#, &EventKind::Signal),
        Routed::Malformed(DecodeError::InvalidEnvelope(_))
    ));
}

#[test]
fn missing_data_decodes_as_null() {
    let envelope = decode_envelope(r#"{"type":"signal"}"#).unwrap();
    assert_eq!(envelope.kind, EventKind::Signal);
    assert!(envelope.data.is_null());
}

#[test]
fn payload_fields_tolerate_backend_variations() {
    let signal = Signal::from(json!({
        "symbol": "MSFT",
        "signal_type": "SELL",
        "confidence": "0.82",
        "timestamp": 1700000000000u64,
        "reasoning": "overbought"
    }));

    assert_eq!(signal.symbol.as_deref(), Some("MSFT"));
    assert_eq!(signal.action.as_deref(), Some("SELL"));
    assert_eq!(signal.confidence, Some(0.82));
    assert_eq!(signal.timestamp, Some(json!(1700000000000u64)));
    assert_eq!(signal.raw["reasoning"], json!("overbought"));

    let trade = Trade::from(json!({"symbol": 7, "action": "BUY", "quantity": "10", "price": null}));
    assert_eq!(trade.symbol.as_deref(), Some("7"));
    assert_eq!(trade.side.as_deref(), Some("BUY"));
    assert_eq!(trade.quantity, Some(10.0));
    assert_eq!(trade.price, None);

    let activity = AgentActivity::from(json!({"agent_name": "risk", "stage": ["odd"]}));
    assert_eq!(activity.agent.as_deref(), Some("risk"));
    assert_eq!(activity.stage, None);
}

#[test]
fn portfolio_positions_may_be_a_list_or_a_map() {
    let listed = PortfolioSnapshot::from(json!({"positions": [{"symbol": "AAPL"}]}));
    assert_eq!(listed.position_count(), 1);

    let keyed = PortfolioSnapshot::from(json!({
        "total_value": "1010.5",
        "positions": {"AAPL": {"qty": 3}, "MSFT": {"qty": 1}}
    }));
    assert_eq!(keyed.position_count(), 2);
    assert_eq!(keyed.total_value, Some(1010.5));
}

#[test]
fn non_object_payloads_are_kept_raw() {
    let snapshot = PortfolioSnapshot::from(json!(42));
    assert_eq!(snapshot.raw, json!(42));
    assert_eq!(snapshot.total_value, None);
    assert_eq!(snapshot.position_count(), 0);

    let signal = Signal::from(serde_json::Value::Null);
    assert_eq!(signal.symbol, None);
    assert!(signal.raw.is_null());
}

#[test]
fn event_kind_tags_round_trip() {
    for tag in ["signal", "trade", "portfolio_update", "agent_activity", "error", "new_kind"] {
        assert_eq!(EventKind::from_tag(tag).as_tag(), tag);
    }
}
