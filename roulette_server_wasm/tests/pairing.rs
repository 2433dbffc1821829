use assert_matches::assert_matches;
use roulette_server_wasm::{ClientEvent, Role, ServerEvent, ServerState, SessionId, SignalPayload};
use serde_json::json;

fn payload(value: serde_json::Value) -> SignalPayload {
    SignalPayload::from_value(&value).unwrap()
}

#[test]
fn two_clients_meet_signal_and_part() {
    let state = ServerState::default();

    let (c1, events) = state.join_or_poll(None);
    assert_eq!(events, vec![ServerEvent::OnlineUsers { count: 1 }]);

    let (c2, events) = state.join_or_poll(None);
    assert_eq!(events, vec![ServerEvent::OnlineUsers { count: 2 }]);
    let (_, events) = state.join_or_poll(Some(c1));
    assert_eq!(events, vec![ServerEvent::OnlineUsers { count: 2 }]);

    state.submit(c1, ClientEvent::SetName { name: "one".into() }).unwrap();
    state.submit(c2, ClientEvent::SetName { name: "two".into() }).unwrap();

    state.submit(c1, ClientEvent::FindPartner).unwrap();
    assert_eq!(state.join_or_poll(Some(c1)).1, vec![ServerEvent::Waiting]);

    state.submit(c2, ClientEvent::FindPartner).unwrap();
    let session_id = SessionId::new(c2, c1, 1);
    assert_eq!(
        state.join_or_poll(Some(c2)).1,
        vec![ServerEvent::PartnerFound {
            session_id: session_id.clone(),
            role: Role::Initiator,
            partner_name: Some("one".into()),
        }]
    );
    assert_eq!(
        state.join_or_poll(Some(c1)).1,
        vec![ServerEvent::PartnerFound {
            session_id: session_id.clone(),
            role: Role::Responder,
            partner_name: Some("two".into()),
        }]
    );
    assert_eq!(state.waiting(), None);

    state
        .submit(c1, ClientEvent::Signal { session_id, data: payload(json!("X")) })
        .unwrap();
    assert_eq!(
        state.join_or_poll(Some(c2)).1,
        vec![ServerEvent::Signal { data: payload(json!("X")) }]
    );
    assert!(state.join_or_poll(Some(c1)).1.is_empty());

    state.remove_client(&c2).unwrap();
    assert_eq!(
        state.join_or_poll(Some(c1)).1,
        vec![ServerEvent::PartnerLeft, ServerEvent::OnlineUsers { count: 1 }]
    );
}

#[test]
fn explicit_leave_notifies_partner_once() {
    let state = ServerState::default();
    let (a, _) = state.join_or_poll(None);
    let (b, _) = state.join_or_poll(None);
    state.submit(a, ClientEvent::FindPartner).unwrap();
    state.submit(b, ClientEvent::FindPartner).unwrap();
    let session_id = SessionId::new(b, a, 1);
    state.join_or_poll(Some(a));
    state.join_or_poll(Some(b));

    let leave = ClientEvent::Leave { session_id: session_id.clone() };
    state.submit(b, leave.clone()).unwrap();
    state.submit(b, leave.clone()).unwrap();
    state.submit(a, leave).unwrap();

    assert_eq!(state.join_or_poll(Some(a)).1, vec![ServerEvent::PartnerLeft]);
    assert!(state.join_or_poll(Some(b)).1.is_empty());

    // signals racing a dissolved session are dropped
    state
        .submit(a, ClientEvent::Signal { session_id, data: payload(json!({"type": "answer"})) })
        .unwrap();
    assert!(state.join_or_poll(Some(b)).1.is_empty());
}

#[test]
fn payload_is_relayed_verbatim() {
    let state = ServerState::default();
    let (a, _) = state.join_or_poll(None);
    let (b, _) = state.join_or_poll(None);
    let (bystander, _) = state.join_or_poll(None);
    state.submit(a, ClientEvent::FindPartner).unwrap();
    state.submit(b, ClientEvent::FindPartner).unwrap();
    for id in [a, b, bystander] {
        state.join_or_poll(Some(id));
    }

    let offer = SignalPayload::from_json(
        r#"{"type":"offer", "sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n","extra":[1,2.50,null,{"nested":true}]}"#,
    )
    .unwrap();
    state
        .submit(b, ClientEvent::Signal { session_id: SessionId::new(b, a, 1), data: offer.clone() })
        .unwrap();

    assert_eq!(state.join_or_poll(Some(a)).1, vec![ServerEvent::Signal { data: offer }]);
    assert!(state.join_or_poll(Some(b)).1.is_empty());
    assert!(state.join_or_poll(Some(bystander)).1.is_empty());
}

#[test]
fn idle_clients_are_reaped_before_the_next_request() {
    fn start() -> u64 {
        1_000_000
    }
    fn later() -> u64 {
        1_000_000 + 31_000
    }

    let early = ServerState::default().with_clock(start);
    let (waiting, _) = early.join_or_poll(None);
    early.submit(waiting, ClientEvent::FindPartner).unwrap();

    let late = early.clone().with_clock(later);
    let (newcomer, events) = late.join_or_poll(None);
    assert_ne!(newcomer, waiting);
    assert_eq!(events, vec![ServerEvent::OnlineUsers { count: 1 }]);

    late.submit(newcomer, ClientEvent::FindPartner).unwrap();
    assert_matches!(late.join_or_poll(Some(newcomer)).1.as_slice(), [ServerEvent::Waiting]);
    assert_eq!(late.waiting(), Some(newcomer));
}
