use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc::Receiver;
use tungstenite::protocol::Message as WsMessage;

use super::{Payload, PayloadDecoders, PayloadError, PayloadType, dispatch};
use crate::client::{CompleteIdentity, Connection};
use crate::hub::{Hub, Topic};

fn identity(complete: &str) -> CompleteIdentity {
    CompleteIdentity::parse(complete).unwrap()
}

fn connect(hub: &Hub, complete: &str) -> (Arc<Connection>, Receiver<WsMessage>) {
    let (conn, rx) = Connection::channel(identity(complete), 16);
    hub.register(conn.clone());
    (conn, rx)
}

fn drain(rx: &mut Receiver<WsMessage>) -> Vec<String> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame.to_text().unwrap().to_string());
    }
    frames
}

fn frame(value: Value) -> WsMessage {
    WsMessage::text(value.to_string())
}

fn chat(from: &str, to: &str) -> Value {
    json!({
        "type": "chat_message",
        "from": from,
        "to": to,
        "id": "m-1",
        "body": "hello",
        "sendAt": "2024-05-01T10:00:00Z"
    })
}

#[test]
fn test_decoder_table_covers_every_type() {
    let decoders = PayloadDecoders::new();
    assert_eq!(decoders.len(), PayloadType::ALL.len());
    for kind in PayloadType::ALL {
        assert!(decoders.get(kind.as_str()).is_some(), "{kind} missing");
    }
    assert!(decoders.get("user_presence_info").is_none());
    assert!(decoders.get("group_chat_message").is_none());
}

#[test]
fn test_chat_message_fans_out_to_recipient_and_echoes_to_other_devices() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob_x, mut rx_x) = connect(&hub, "bob@X");
    let (_bob_y, mut rx_y) = connect(&hub, "bob@Y");

    let sent = chat("alice", "bob").to_string();
    let kind = dispatch(&hub, &alice_a, &WsMessage::text(sent.clone())).unwrap();
    assert_eq!(kind, PayloadType::ChatMessage);

    assert_eq!(drain(&mut rx_x), vec![sent.clone()]);
    assert_eq!(drain(&mut rx_y), vec![sent.clone()]);
    assert_eq!(drain(&mut rx_b), vec![sent]);
    assert!(drain(&mut rx_a).is_empty());
}

#[test]
fn test_chat_message_to_self_only_echoes() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");

    dispatch(&hub, &alice_a, &frame(chat("alice", "alice"))).unwrap();

    assert_eq!(drain(&mut rx_b).len(), 1);
    assert!(drain(&mut rx_a).is_empty());
}

#[test]
fn test_frame_is_forwarded_verbatim() {
    let hub = Hub::new();
    let (alice, _rx_a) = connect(&hub, "alice@deviceA");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let raw = r#"{ "type":"chat_message", "from":"alice","to":"bob","id":"m-9",
        "body":"hi","sendAt":"2024-05-01T10:00:00Z","clientOnly":{"x":1} }"#;
    dispatch(&hub, &alice, &WsMessage::text(raw)).unwrap();

    assert_eq!(drain(&mut rx_bob), vec![raw.to_string()]);
}

#[test]
fn test_binary_frames_are_dispatched_and_forwarded_as_binary() {
    let hub = Hub::new();
    let (alice, _rx_a) = connect(&hub, "alice@deviceA");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let raw = chat("alice", "bob").to_string().into_bytes();
    dispatch(&hub, &alice, &WsMessage::binary(raw.clone())).unwrap();

    match rx_bob.try_recv() {
        Ok(WsMessage::Binary(bytes)) => assert_eq!(bytes.as_ref(), raw.as_slice()),
        other => panic!("expected binary frame, got {other:?}"),
    }
}

#[test]
fn test_typing_status_to_self_produces_no_deliveries() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");

    let typing = json!({"type": "typing_status", "from": "alice", "to": "alice"});
    dispatch(&hub, &alice_a, &frame(typing)).unwrap();

    assert!(drain(&mut rx_a).is_empty());
    assert!(drain(&mut rx_b).is_empty());
}

#[test]
fn test_typing_status_reaches_recipient_only() {
    let hub = Hub::new();
    let (alice_a, _rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let typing = json!({"type": "typing_status", "from": "alice", "to": "bob"});
    dispatch(&hub, &alice_a, &frame(typing)).unwrap();

    assert_eq!(drain(&mut rx_bob).len(), 1);
    assert!(drain(&mut rx_b).is_empty());
}

#[test]
fn test_edit_message_accepts_edited_on() {
    let hub = Hub::new();
    let (alice_a, _rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let edit = json!({
        "type": "edit_message",
        "from": "alice",
        "to": "bob",
        "id": "m-1",
        "body": "edited",
        "editedOn": "2024-05-01T10:05:00Z"
    });
    assert_eq!(
        dispatch(&hub, &alice_a, &frame(edit)).unwrap(),
        PayloadType::EditMessage
    );

    assert_eq!(drain(&mut rx_bob).len(), 1);
    assert_eq!(drain(&mut rx_b).len(), 1);
}

#[test]
fn test_delete_message_for_sender_only() {
    let hub = Hub::new();
    let (alice_a, _rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let delete = json!({
        "type": "delete_message",
        "from": "alice",
        "to": "bob",
        "id": ["m-1", "m-2"]
    });
    dispatch(&hub, &alice_a, &frame(delete)).unwrap();

    assert!(drain(&mut rx_bob).is_empty());
    assert_eq!(drain(&mut rx_b).len(), 1);
}

#[test]
fn test_delete_message_for_everyone_accepts_string_flag() {
    let hub = Hub::new();
    let (alice_a, _rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let delete = json!({
        "type": "delete_message",
        "from": "alice",
        "to": "bob",
        "id": "m-1",
        "everyone": "true"
    });
    dispatch(&hub, &alice_a, &frame(delete)).unwrap();

    assert_eq!(drain(&mut rx_bob).len(), 1);
    assert_eq!(drain(&mut rx_b).len(), 1);
}

#[test]
fn test_delete_message_rejects_empty_id_list() {
    let hub = Hub::new();
    let (alice, _rx) = connect(&hub, "alice@deviceA");

    let delete = json!({"type": "delete_message", "from": "alice", "to": "bob", "id": []});
    let err = dispatch(&hub, &alice, &frame(delete)).unwrap_err();
    assert!(matches!(err, PayloadError::Validation(_)));
}

#[test]
fn test_friend_request_to_self_is_a_no_op() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let before = hub.stats();

    let request = json!({
        "type": "user_send_friend_request",
        "from": "alice",
        "to": "alice",
        "requestedBy": "alice",
        "addedOn": "2024-05-01T10:00:00Z"
    });
    dispatch(&hub, &alice_a, &frame(request)).unwrap();

    assert!(drain(&mut rx_a).is_empty());
    assert!(drain(&mut rx_b).is_empty());
    assert_eq!(hub.stats(), before);
}

#[test]
fn test_friend_accept_reaches_target_and_other_devices() {
    let hub = Hub::new();
    let (bob_a, mut rx_a) = connect(&hub, "bob@deviceA");
    let (_bob_b, mut rx_b) = connect(&hub, "bob@deviceB");
    let (_alice_x, mut rx_x) = connect(&hub, "alice@X");
    let (_alice_y, mut rx_y) = connect(&hub, "alice@Y");

    let accept = json!({
        "type": "user_accepted_friend_request",
        "from": "bob",
        "to": "alice",
        "requestedBy": "alice",
        "addedOn": "2024-05-01T10:00:00Z"
    });
    assert_eq!(
        dispatch(&hub, &bob_a, &frame(accept)).unwrap(),
        PayloadType::AcceptedFriendRequest
    );

    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert_eq!(drain(&mut rx_x).len(), 1);
    assert_eq!(drain(&mut rx_y).len(), 1);
}

#[test]
fn test_remove_friend_relation() {
    let hub = Hub::new();
    let (alice_a, _rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let removal = json!({"type": "user_removes_friend_relation", "from": "alice", "to": "bob"});
    dispatch(&hub, &alice_a, &frame(removal)).unwrap();
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert_eq!(drain(&mut rx_bob).len(), 1);

    let to_self = json!({"type": "user_removes_friend_relation", "from": "alice", "to": "alice"});
    dispatch(&hub, &alice_a, &frame(to_self)).unwrap();
    assert!(drain(&mut rx_b).is_empty());
}

#[test]
fn test_profile_update_and_root_node_only_sync_other_devices() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let profile = json!({"type": "user_update_profile", "from": "alice", "name": "Alice"});
    dispatch(&hub, &alice_a, &frame(profile)).unwrap();

    let node = json!({"type": "user_create_root_node", "from": "alice", "id": "post-1", "nodeType": "post"});
    dispatch(&hub, &alice_a, &frame(node)).unwrap();

    assert_eq!(drain(&mut rx_b).len(), 2);
    assert!(drain(&mut rx_a).is_empty());
    assert!(drain(&mut rx_bob).is_empty());
}

fn like(from: &str, owner: &str) -> Value {
    json!({
        "type": "user_node_like_action",
        "from": from,
        "to": owner,
        "isLike": true,
        "likeCount": 3,
        "commentCount": 1,
        "nodeId": "post-1",
        "nodeType": "post",
        "parents": [{"nodeId": "post-1", "nodeType": "post"}]
    })
}

#[test]
fn test_like_action_reaches_owner_and_echoes() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (_alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    dispatch(&hub, &alice_a, &frame(like("alice", "bob"))).unwrap();
    assert_eq!(drain(&mut rx_bob).len(), 1);
    assert_eq!(drain(&mut rx_b).len(), 1);

    dispatch(&hub, &alice_a, &frame(like("alice", "alice"))).unwrap();
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert!(drain(&mut rx_a).is_empty());
    assert!(drain(&mut rx_bob).is_empty());
}

#[test]
fn test_like_action_requires_valid_parents() {
    let hub = Hub::new();
    let (alice, _rx) = connect(&hub, "alice@deviceA");

    let mut payload = like("alice", "bob");
    payload["parents"] = json!([{"nodeId": "", "nodeType": "post"}]);
    let err = dispatch(&hub, &alice, &frame(payload)).unwrap_err();
    assert!(matches!(err, PayloadError::Validation(_)));

    let mut payload = like("alice", "bob");
    payload.as_object_mut().unwrap().remove("parents");
    let err = dispatch(&hub, &alice, &frame(payload)).unwrap_err();
    assert!(matches!(err, PayloadError::Decode(_)));
}

#[test]
fn test_secondary_node_reaches_every_interested_party() {
    let hub = Hub::new();
    let (carol_1, mut rx_c1) = connect(&hub, "carol@one");
    let (_carol_2, mut rx_c2) = connect(&hub, "carol@two");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");
    let (_dave, mut rx_dave) = connect(&hub, "dave@phone");
    let (_erin, mut rx_erin) = connect(&hub, "erin@phone");
    let (_frank, mut rx_frank) = connect(&hub, "frank@phone");

    let reply = json!({
        "type": "user_create_secondary_node",
        "from": "carol",
        "to": "bob",
        "nodeId": "comment-7",
        "nodeType": "comment",
        "mentions": ["dave", "carol", "bob", "dave"],
        "replyOnNodeCreatedBy": "erin",
        "parents": [{"nodeId": "post-1", "nodeType": "post"}]
    });
    assert_eq!(
        dispatch(&hub, &carol_1, &frame(reply)).unwrap(),
        PayloadType::CreateSecondaryNode
    );

    // the creator's originating device is included here
    assert_eq!(drain(&mut rx_c1).len(), 1);
    assert_eq!(drain(&mut rx_c2).len(), 1);
    assert_eq!(drain(&mut rx_bob).len(), 1);
    // listed twice, delivered twice
    assert_eq!(drain(&mut rx_dave).len(), 2);
    assert_eq!(drain(&mut rx_erin).len(), 1);
    assert!(drain(&mut rx_frank).is_empty());
}

#[test]
fn test_secondary_node_mentioned_reply_author_gets_both_deliveries() {
    let hub = Hub::new();
    let (carol, _rx_carol) = connect(&hub, "carol@one");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");
    let (_erin, mut rx_erin) = connect(&hub, "erin@phone");

    let reply = json!({
        "type": "user_create_secondary_node",
        "from": "carol",
        "to": "bob",
        "nodeId": "comment-8",
        "nodeType": "comment",
        "mentions": ["erin"],
        "replyOnNodeCreatedBy": "erin",
        "parents": [{"nodeId": "post-1", "nodeType": "post"}]
    });
    dispatch(&hub, &carol, &frame(reply)).unwrap();

    assert_eq!(drain(&mut rx_erin).len(), 2);
    assert_eq!(drain(&mut rx_bob).len(), 1);
}

#[test]
fn test_poll_vote_skips_only_the_voting_device() {
    let hub = Hub::new();
    let (alice_a, mut rx_a) = connect(&hub, "alice@deviceA");
    let (alice_b, mut rx_b) = connect(&hub, "alice@deviceB");
    let (bob_x, mut rx_x) = connect(&hub, "bob@X");
    let (_bob_y, mut rx_y) = connect(&hub, "bob@Y");

    for conn in [&alice_a, &alice_b, &bob_x] {
        let subscribe = json!({"type": "poll_subscription", "from": conn.user(), "pollId": "poll-1"});
        dispatch(&hub, conn, &frame(subscribe)).unwrap();
    }
    assert_eq!(hub.subscriptions().subscribers(&Topic::content("poll-1")).len(), 3);
    assert_eq!(alice_a.subscriptions(), vec![Topic::content("poll-1")]);

    let vote = json!({"type": "poll_votes_update", "from": "alice", "pollId": "poll-1", "votes": [1, 0, 4]});
    dispatch(&hub, &alice_a, &frame(vote)).unwrap();

    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(drain(&mut rx_b).len(), 1);
    assert_eq!(drain(&mut rx_x).len(), 1);
    assert!(drain(&mut rx_y).is_empty());
}

#[test]
fn test_poll_vote_prunes_vanished_subscriber() {
    let hub = Hub::new();
    let (alice, _rx_a) = connect(&hub, "alice@deviceA");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");
    let topic = Topic::content("poll-1");
    let ghost = identity("ghost@gone");

    hub.subscribe(topic.clone(), &ghost);
    hub.subscribe(topic.clone(), &identity("bob@phone"));
    assert!(hub.subscriptions().is_subscribed(&topic, &ghost));

    let vote = json!({"type": "poll_votes_update", "from": "alice", "pollId": "poll-1", "votes": [2]});
    dispatch(&hub, &alice, &frame(vote)).unwrap();

    assert!(!hub.subscriptions().is_subscribed(&topic, &ghost));
    assert_eq!(drain(&mut rx_bob).len(), 1);
}

#[test]
fn test_presence_subscription_payload_subscribes_and_unsubscribes() {
    let hub = Hub::new();
    let (bob, mut rx_bob) = connect(&hub, "bob@phone");
    let topic = Topic::presence("alice");

    let subscribe = json!({"type": "user_presence_subscription", "from": "bob", "user": "alice", "subscribe": true});
    dispatch(&hub, &bob, &frame(subscribe)).unwrap();
    assert!(hub.subscriptions().is_subscribed(&topic, bob.identity()));

    let snapshot: Value = serde_json::from_str(&drain(&mut rx_bob)[0]).unwrap();
    assert_eq!(
        snapshot,
        json!({"type": "user_presence_info", "user": "alice", "online": false})
    );

    let unsubscribe = json!({"type": "user_presence_subscription", "from": "bob", "user": "alice"});
    dispatch(&hub, &bob, &frame(unsubscribe)).unwrap();
    assert!(!hub.subscriptions().contains_topic(&topic));
    assert!(bob.subscriptions().is_empty());
}

#[test]
fn test_identity_mismatch_is_dropped() {
    let hub = Hub::new();
    let (mallory, _rx_m) = connect(&hub, "mallory@laptop");
    let (_bob, mut rx_bob) = connect(&hub, "bob@phone");

    let err = dispatch(&hub, &mallory, &frame(chat("alice", "bob"))).unwrap_err();
    match err {
        PayloadError::IdentityMismatch { claimed, actual } => {
            assert_eq!(claimed, "alice");
            assert_eq!(actual, "mallory");
        }
        other => panic!("expected identity mismatch, got {other:?}"),
    }
    assert!(drain(&mut rx_bob).is_empty());
}

#[test]
fn test_unknown_and_server_only_types_are_dropped() {
    let hub = Hub::new();
    let (alice, _rx) = connect(&hub, "alice@deviceA");

    for kind in ["group_chat_message", "user_presence_info"] {
        let payload = json!({"type": kind, "from": "alice", "user": "bob", "online": true});
        let err = dispatch(&hub, &alice, &frame(payload)).unwrap_err();
        assert!(matches!(err, PayloadError::UnknownType(ref t) if t == kind));
    }
}

#[test]
fn test_malformed_frames_are_rejected() {
    let hub = Hub::new();
    let (alice, _rx) = connect(&hub, "alice@deviceA");

    let err = dispatch(&hub, &alice, &WsMessage::text("not json")).unwrap_err();
    assert!(matches!(err, PayloadError::Decode(_)));

    let err = dispatch(&hub, &alice, &frame(json!({"type": "chat_message"}))).unwrap_err();
    assert!(matches!(err, PayloadError::Decode(_)));

    let err = dispatch(&hub, &alice, &frame(json!({"type": "", "from": "alice"}))).unwrap_err();
    assert!(matches!(err, PayloadError::Validation(_)));

    let mut missing_body = chat("alice", "bob");
    missing_body["body"] = json!("");
    let err = dispatch(&hub, &alice, &frame(missing_body)).unwrap_err();
    assert!(matches!(err, PayloadError::Validation(_)));

    let err = dispatch(&hub, &alice, &WsMessage::Ping(Default::default())).unwrap_err();
    assert!(matches!(err, PayloadError::UnsupportedFrame));
}

#[test]
fn test_payload_kind_matches_decoded_variant() {
    let decoders = PayloadDecoders::new();
    let data = json!({"type": "poll_subscription", "from": "alice", "pollId": "p"}).to_string();
    let decoder = decoders.get("poll_subscription").unwrap();
    let payload = decoder(data.as_bytes()).unwrap();
    assert!(matches!(payload, Payload::PollSubscription(ref p) if p.poll_id == "p"));
    assert_eq!(payload.kind(), PayloadType::PollSubscription);
}
