//! Dispatcher + codec integration tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vibe_presence::{
        dispatcher::{Dispatcher, LinkEvent},
        protocol::{self, Inbound, MessageType, WireMessage},
        transport::{MemoryTransport, Transport},
    };

    /// What the handlers saw, in order.
    #[derive(Default)]
    struct Recorder {
        messages: Vec<WireMessage>,
        unknown: Vec<String>,
    }

    fn recording_dispatcher() -> (MemoryTransport, Dispatcher<MemoryTransport, Recorder>) {
        let remote = MemoryTransport::new();
        let mut d = Dispatcher::new(remote.clone());
        for kind in MessageType::ALL {
            d.on(kind, |r: &mut Recorder, m: &WireMessage| r.messages.push(m.clone()));
        }
        d.on_unknown(|r: &mut Recorder, label: &str| r.unknown.push(label.to_string()));
        remote.open();
        (remote, d)
    }

    fn every_variant() -> Vec<WireMessage> {
        vec![
            WireMessage::position(42.5, -7.0),
            WireMessage::chat("plain"),
            WireMessage::Chat {
                text: "full".into(),
                sender_id: Some("u1".into()),
                sender_name: Some("Ann".into()),
                timestamp: Some(1_700_000_000_000.0),
            },
            WireMessage::zone_join("cafe", "counter"),
            WireMessage::zone_leave("cafe", "counter"),
            WireMessage::Identity {
                display_name: "Ann".into(),
                photo: None,
            },
            WireMessage::identity("Ann", None),
            WireMessage::identity("Ann", Some("https://img/ann.png".into())),
            WireMessage::IdentityAck {
                session_token: "tok".into(),
                display_name: "Ann".into(),
            },
            WireMessage::Transcript {
                speaker_id: "u2".into(),
                speaker_name: "Bob".into(),
                text: "hello there".into(),
                timestamp: 12.0,
            },
            WireMessage::Presence {
                user_id: "u3".into(),
                display_name: "Cy".into(),
                photo: None,
                x: 100.0,
                y: 200.0,
                zone_id: "".into(),
                space_id: "cafe".into(),
            },
            WireMessage::Audio {
                data: "AAECAw==".into(),
            },
            WireMessage::Error {
                code: "RATE".into(),
                message: "slow down".into(),
            },
        ]
    }

    // -----------------------------------------------------------------------
    // Codec
    // -----------------------------------------------------------------------

    #[test]
    fn every_variant_survives_the_wire() {
        for msg in every_variant() {
            let frame = protocol::encode(&msg).unwrap();
            assert_eq!(
                protocol::decode(&frame).unwrap(),
                Inbound::Message(msg.clone()),
                "{msg:?}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    #[test]
    fn inbound_dispatched_in_arrival_order() {
        let (remote, mut d) = recording_dispatcher();
        let sent = every_variant();
        for msg in &sent {
            remote.push_message(msg).unwrap();
        }

        let mut rec = Recorder::default();
        assert_eq!(d.poll(&mut rec), vec![LinkEvent::Opened]);
        assert_eq!(rec.messages, sent);
        assert!(rec.unknown.is_empty());
    }

    #[test]
    fn unknown_shapes_reach_the_hook_with_a_label() {
        let (remote, mut d) = recording_dispatcher();
        remote.push_frame(rmp_serde::to_vec_named(&json!({ "type": "teleport" })).unwrap());
        remote.push_frame(rmp_serde::to_vec_named(&json!({ "type": 5 })).unwrap());
        remote.push_frame(rmp_serde::to_vec_named(&json!({ "x": 1 })).unwrap());
        remote.push_frame(rmp_serde::to_vec(&json!("position")).unwrap());
        // {1: "x"}: integer keys are valid MessagePack
        remote.push_frame(vec![0x81, 0x01, 0xa1, b'x']);
        // top-level bin8
        remote.push_frame(vec![0xc4, 0x02, 0x00, 0x01]);

        let mut rec = Recorder::default();
        d.poll(&mut rec);
        assert!(rec.messages.is_empty());
        assert_eq!(
            rec.unknown,
            vec!["teleport", "unknown", "unknown", "non-object", "unknown", "non-object"]
        );
    }

    #[test]
    fn fractional_chat_timestamp_reaches_the_handler() {
        let (remote, mut d) = recording_dispatcher();
        remote.push_frame(
            rmp_serde::to_vec_named(&json!({ "type": "chat", "text": "hi", "timestamp": 1.5 })).unwrap(),
        );

        let mut rec = Recorder::default();
        d.poll(&mut rec);
        assert_eq!(
            rec.messages,
            vec![WireMessage::Chat {
                text: "hi".into(),
                sender_id: None,
                sender_name: None,
                timestamp: Some(1.5),
            }]
        );
    }

    #[test]
    fn malformed_frames_are_dropped_silently() {
        let (remote, mut d) = recording_dispatcher();
        remote.push_frame(vec![0x92, 0x01]);
        remote.push_frame(Vec::new());
        remote.push_frame(rmp_serde::to_vec_named(&json!({ "type": "presence", "userId": "u1" })).unwrap());
        remote.push_message(&WireMessage::position(1.0, 2.0)).unwrap();

        let mut rec = Recorder::default();
        d.poll(&mut rec);
        assert_eq!(rec.messages, vec![WireMessage::position(1.0, 2.0)]);
        assert!(rec.unknown.is_empty());
    }

    #[test]
    fn missing_handler_is_not_an_error() {
        let remote = MemoryTransport::new();
        let mut d: Dispatcher<_, Recorder> = Dispatcher::new(remote.clone());
        remote.open();
        remote.push_message(&WireMessage::chat("nobody listens")).unwrap();

        let mut rec = Recorder::default();
        d.poll(&mut rec);
        assert!(rec.messages.is_empty());
        assert!(rec.unknown.is_empty());
    }

    // -----------------------------------------------------------------------
    // Connection state
    // -----------------------------------------------------------------------

    #[test]
    fn sends_preserve_call_order() {
        let (remote, mut d) = recording_dispatcher();
        assert!(d.send(&WireMessage::position(1.0, 1.0)));
        assert!(d.send(&WireMessage::chat("a")));
        assert!(d.send(&WireMessage::position(2.0, 2.0)));
        assert_eq!(
            remote.sent_messages(),
            vec![
                WireMessage::position(1.0, 1.0),
                WireMessage::chat("a"),
                WireMessage::position(2.0, 2.0),
            ]
        );
    }

    #[test]
    fn close_is_idempotent_and_immediate() {
        let (remote, mut d) = recording_dispatcher();
        assert!(d.connected());
        d.close();
        assert!(!d.connected());
        d.close();
        assert!(!d.connected());
        assert!(!d.transport().is_open());

        assert!(!d.send(&WireMessage::position(1.0, 1.0)));
        assert!(remote.sent_frames().is_empty());
    }

    #[test]
    fn remote_close_is_reported_after_earlier_frames() {
        let (remote, mut d) = recording_dispatcher();
        remote.push_message(&WireMessage::chat("last words")).unwrap();
        remote.remote_close(1001, "going away");

        let mut rec = Recorder::default();
        let link = d.poll(&mut rec);
        assert_eq!(rec.messages.len(), 1);
        assert_eq!(
            link,
            vec![
                LinkEvent::Opened,
                LinkEvent::Closed {
                    code: 1001,
                    reason: "going away".into()
                }
            ]
        );
        assert!(!d.connected());
    }
}
