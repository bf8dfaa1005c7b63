use desk_app::app::reducer::reduce;
use desk_app::app::{AppEvent, AppState, Channel, ChannelStatus, SocketEvent};
use desk_app::config::AppConfig;
use desk_app::feed::parse::parse_frame;
use desk_app::model::InstanceId;
use desk_app::premium::EmptyPremiumPolicy;

/// Push one raw frame through parser and reducer; returns whether the store changed.
fn push(state: &mut AppState, channel: Channel, raw: &str) -> bool {
    let frame = parse_frame(channel, raw).expect("frame parses");
    match frame.into_feed_event(1_700_000_000) {
        Some(ev) => reduce(state, AppEvent::Feed(ev)),
        None => false,
    }
}

const NIFTY: &str =
    r#"{"event":"indexPrice","data":{"id":256265,"name":"NIFTY 50","segment":"INDICES","price":24310.5}}"#;

#[test]
fn price_stream_upserts_by_instrument() {
    let mut s = AppState::default();
    assert!(push(&mut s, Channel::Price, NIFTY));
    assert!(!push(&mut s, Channel::Price, NIFTY));
    assert!(push(
        &mut s,
        Channel::Price,
        r#"{"event":"indexPrice","data":{"id":"256265","name":"ignored","segment":"ignored","price":"24311"}}"#
    ));

    assert_eq!(s.index_prices().len(), 1);
    let stored = s.index_price(256265).unwrap();
    assert_eq!(stored.price, 24311.0);
    assert_eq!(stored.name, "NIFTY 50");
    assert_eq!(s.candles.get(256265).map(|c| c.snapshot().len()), Some(1));
}

#[test]
fn premium_stream_tracks_lowest_value_per_instance() {
    let mut s = AppState::default();
    let raw = r#"{"event":"optionPremium","data":[
        {"id":"A","combinedPremiumArray":[{"name":"S1","combinedPremium":12.5},{"name":"S2","combinedPremium":9.25}]},
        {"id":"B","combinedPremiumArray":[]}
    ]}"#;
    assert!(push(&mut s, Channel::Premium, raw));
    assert_eq!(s.lowest_value(&InstanceId::new("A")), Some(9.25));
    assert_eq!(s.lowest_value(&InstanceId::new("B")), None);
    assert_eq!(s.premium_snapshots.len(), 2);

    let later = r#"{"event":"optionPremium","data":[
        {"id":"A","combinedPremiumArray":[{"name":"S1","combinedPremium":14},{"name":"S2","combinedPremium":"11.75"}]}
    ]}"#;
    assert!(push(&mut s, Channel::Premium, later));
    assert_eq!(s.lowest_value(&InstanceId::new("A")), Some(11.75));
}

#[test]
fn bad_snapshot_in_batch_only_costs_itself() {
    let mut s = AppState::default();
    let raw = r#"{"event":"optionPremium","data":[
        {"id":"A","combinedPremiumArray":[{"name":"S1","combinedPremium":12.5},{"name":"S2","combinedPremium":9.25}]},
        {"id":"B","combinedPremiumArray":"oops"}
    ]}"#;
    assert!(push(&mut s, Channel::Premium, raw));
    assert_eq!(s.lowest_value(&InstanceId::new("A")), Some(9.25));
    assert_eq!(s.lowest_value(&InstanceId::new("B")), None);
}

#[test]
fn sentinel_policy_fills_empty_instances() {
    let cfg: AppConfig =
        serde_json::from_str(r#"{"premium_policy":{"empty":{"mode":"sentinel","value":0.0}}}"#).unwrap();
    assert_eq!(cfg.premium_policy.empty, EmptyPremiumPolicy::Sentinel { value: 0.0 });

    let mut s = AppState::from_config(&cfg);
    push(&mut s, Channel::Premium, r#"{"event":"optionPremium","data":[{"id":"B","combinedPremiumArray":[]}]}"#);
    assert_eq!(s.lowest_value(&InstanceId::new("B")), Some(0.0));
}

#[test]
fn mtm_and_disconnect_keep_the_store() {
    let mut s = AppState::default();
    push(&mut s, Channel::Price, NIFTY);
    push(&mut s, Channel::Premium, r#"{"event":"mtm","data":[{"id":"A","mtm":-420.0},{"id":"B","mtm":null}]}"#);
    assert_eq!(s.mtm.get(&InstanceId::new("A")).and_then(|m| m.latest()), Some(-420.0));
    assert!(s.mtm.get(&InstanceId::new("B")).is_none());

    reduce(
        &mut s,
        AppEvent::Socket(SocketEvent::Disconnected { channel: Channel::Price, reason: "eof".into() }),
    );
    assert!(matches!(s.channel_status(Channel::Price), ChannelStatus::Disconnected { .. }));
    assert_eq!(s.index_prices().len(), 1);
    assert_eq!(s.notifications.len(), 1);
}
