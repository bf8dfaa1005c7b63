use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tiny_http::{Header, Method, Response, Server};

use desk_app::app::reducer::reduce;
use desk_app::app::{AppEvent, AppState, ExecEvent};
use desk_app::model::{InstanceId, OptionType, Side, TradeLeg};
use desk_app::rest::DeskClient;
use desk_app::trade_desk::{follow_up, run_command, spawn_command, DeskCommand};
use desk_app::DeskError;

/// What the fake backend saw for one request.
#[derive(Debug)]
struct Seen {
    method: Method,
    url: String,
    auth: Option<String>,
    body: String,
}

/// Serve `replies` in order, one per request, then stop.
fn backend(replies: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Seen>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in replies {
            let Ok(mut req) = server.recv() else { return };
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let auth = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.to_string());
            let _ = tx.send(Seen {
                method: req.method().clone(),
                url: req.url().to_string(),
                auth,
                body: raw,
            });
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let _ = req.respond(Response::from_string(body).with_status_code(status).with_header(header));
        }
    });
    (format!("http://127.0.0.1:{port}/api"), rx)
}

fn client(base: &str) -> DeskClient {
    DeskClient::new(base, Some("tok-123".into()), Duration::from_secs(5)).unwrap()
}

fn leg(quantity: u32) -> TradeLeg {
    TradeLeg {
        id: "t9".into(),
        instance_id: InstanceId::new("1"),
        strike: 24300.0,
        option_type: OptionType::Call,
        side: Side::Sell,
        quantity,
        entry_price: 120.0,
        status: "OPEN".into(),
    }
}

#[test]
fn lists_instances_with_bearer_token() {
    let (base, seen) = backend(vec![(
        200,
        r#"[{"id":1,"name":"Nifty weekly straddle","underlying":"NIFTY","expiry":"2026-10-22",
             "legs":[{"id":"t1","instanceId":1,"strike":24300,"optionType":"CE","side":"SELL","quantity":50}]}]"#,
    )]);

    let instances = client(&base).list_instances().unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].id, InstanceId::new("1"));
    assert_eq!(instances[0].legs[0].option_type, OptionType::Call);

    let req = seen.recv().unwrap();
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.url, "/api/instances");
    assert_eq!(req.auth.as_deref(), Some("Bearer tok-123"));
}

#[test]
fn rejected_token_maps_to_unauthorized() {
    let (base, _seen) = backend(vec![(401, r#"{"detail":"token expired"}"#)]);
    let err = client(&base).list_instances().unwrap_err();
    assert!(matches!(err, DeskError::Unauthorized(ref m) if m.contains("token expired")));
}

#[test]
fn server_error_keeps_status_and_body() {
    let (base, _seen) = backend(vec![(503, "maintenance")]);
    match client(&base).list_trades(&InstanceId::new("1")).unwrap_err() {
        DeskError::HttpStatus { status, text } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(text, "maintenance");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn partial_close_posts_quantity_and_returns_remaining_leg() {
    let (base, seen) = backend(vec![(
        200,
        r#"{"id":"t9","instanceId":"1","strike":24300,"optionType":"CE","side":"SELL","quantity":25,"entryPrice":120}"#,
    )]);

    let after = client(&base).partial_close(&leg(50), 25).unwrap();
    assert_eq!(after.quantity, 25);

    let req = seen.recv().unwrap();
    assert_eq!(req.method, Method::Post);
    assert_eq!(req.url, "/api/trades/t9/close");
    let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["quantity"], 25);
}

#[test]
fn oversized_close_never_reaches_the_backend() {
    let (base, seen) = backend(vec![]);
    let err = client(&base).partial_close(&leg(10), 11).unwrap_err();
    assert!(matches!(err, DeskError::Invalid(_)));
    assert!(seen.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn worker_reports_outcomes_on_the_event_channel() {
    let (base, _seen) = backend(vec![(200, "[]"), (403, "forbidden")]);
    let c = client(&base);

    let (tx, rx) = mpsc::channel();
    spawn_command(tx, c.clone(), DeskCommand::LoadInstances);
    match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
        AppEvent::Exec(ExecEvent::InstancesLoaded { instances }) => assert!(instances.is_empty()),
        other => panic!("unexpected {other:?}"),
    }

    match run_command(&c, DeskCommand::CancelOrder { order_id: "o1".into() }) {
        ExecEvent::Failed { unauthorized, label, .. } => {
            assert!(unauthorized);
            assert_eq!(label, "cancel order o1");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn loaded_instances_pull_their_legs() {
    let (base, seen) = backend(vec![
        (200, r#"[{"id":1,"name":"Nifty straddle"},{"id":"2","name":"Bank strangle"}]"#),
        (
            200,
            r#"[{"id":"t1","instanceId":1,"strike":24300,"optionType":"CE","side":"SELL","quantity":50}]"#,
        ),
        (200, "[]"),
    ]);
    let c = client(&base);
    let mut state = AppState::default();

    let loaded = AppEvent::Exec(run_command(&c, DeskCommand::LoadInstances));
    let cmds = follow_up(&loaded);
    reduce(&mut state, loaded);
    assert_eq!(cmds.len(), 2);

    for cmd in cmds {
        let ev = AppEvent::Exec(run_command(&c, cmd));
        assert!(follow_up(&ev).is_empty());
        reduce(&mut state, ev);
    }

    let urls: Vec<String> = (0..3).map(|_| seen.recv().unwrap().url).collect();
    assert_eq!(urls, vec!["/api/instances", "/api/instances/1/trades", "/api/instances/2/trades"]);
    assert_eq!(state.instance(&InstanceId::new("1")).unwrap().legs.len(), 1);
    assert!(state.instance(&InstanceId::new("2")).unwrap().legs.is_empty());
}
