//! Replay harness tests
#![cfg(feature = "headless")]

#[cfg(test)]
mod tests {
    use spaces_bridge::{
        protocol::entry_points,
        replay::{self, Replayer},
        settings::Settings,
        BridgeState, EntityKind, SpacesConfig,
    };

    const SESSION: &str = r##"
# A short lobby session
{"atMs":0,"event":{"eventName":"BridgeConnecting","data":{"spaceId":"lobby"}}}
{"atMs":10,"event":{"eventName":"BridgeConnect","data":{"spaceId":"lobby","instanceId":"i-1","localActorId":"me"}}}
{"atMs":20,"entity":{"kind":"mediaScreen","id":"main"}}
{"atMs":30,"event":"{\"eventName\":\"ActorJoined\",\"data\":\"{\\\"actorId\\\":\\\"bob\\\",\\\"displayName\\\":\\\"Bob\\\"}\"}"}
{"atMs":40,"local":{"position":{"x":1.0,"y":0.0,"z":0.0},"rotation":{"x":0.0,"y":0.0,"z":0.0,"w":1.0},"scale":{"x":1.0,"y":1.0,"z":1.0}}}
{"atMs":50,"event":{"eventName":"SetMediaScreenImage","data":{"screenId":"main","imageUrl":"https://cdn.example/a.png","mediaType":"image","refreshTimestamp":5}}}
{"atMs":60,"event":{"eventName":"NotARealEvent","data":{}}}
{"atMs":300,"click":{"kind":"mediaScreen","id":"main"}}
"##;

    #[test]
    fn replays_session_in_simulated_time() {
        let lines = replay::parse(SESSION).unwrap();
        assert_eq!(lines.len(), 8);

        let mut replayer = Replayer::new(SpacesConfig::default(), 1.0 / 60.0);
        let report = replayer.run(&lines, 200).unwrap();

        assert_eq!(report.lines, 8);
        assert_eq!(report.unhandled, 1);
        assert_eq!(report.failed, 0);
        assert!(report.frames >= 25);

        let bridge = replayer.spaces().bridge().borrow();
        assert_eq!(bridge.state(), BridgeState::Connected);
        assert!(bridge.actor("bob").is_some());

        let texture = replayer
            .render()
            .borrow()
            .texture_of(EntityKind::MediaScreen, "main")
            .map(|t| t.url.clone());
        assert_eq!(texture.as_deref(), Some("https://cdn.example/a.png?t=5"));

        let called: Vec<&str> = report.sent.iter().map(|m| m.entry_point.as_str()).collect();
        assert!(called.contains(&entry_points::REGISTER_MEDIA_SCREEN));
        assert!(called.contains(&entry_points::MEDIA_SCREEN_CLICKED));

        // ~460 ms of local movement at 20 Hz
        let sends = called
            .iter()
            .filter(|e| **e == entry_points::SEND_LOCAL_TRANSFORM)
            .count();
        assert!((5..=11).contains(&sends), "sends = {}", sends);
    }

    #[test]
    fn realtime_replay_matches_simulated() {
        let text = r#"
{"atMs":0,"event":{"eventName":"BridgeConnect","data":{"spaceId":"s","instanceId":"i","localActorId":"me"}}}
{"atMs":20,"event":{"eventName":"ObjectSpawned","data":{"objectId":"o1","objectType":"ball"}}}
"#;
        let lines = replay::parse(text).unwrap();

        let mut replayer = Replayer::new(SpacesConfig::default(), 0.01);
        let report = tokio_test::block_on(replayer.run_realtime(&lines, 30)).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(replayer.spaces().bridge().borrow().object_count(), 1);
        assert!(report.frames >= 5);
    }

    #[test]
    fn unknown_entity_kind_is_an_error() {
        let lines = replay::parse(r#"{"atMs":0,"entity":{"kind":"teapot","id":"x"}}"#).unwrap();
        let mut replayer = Replayer::new(SpacesConfig::default(), 1.0 / 60.0);
        assert!(replayer.run(&lines, 0).is_err());
    }

    #[test]
    fn failing_texture_is_reported_not_fatal() {
        let text = r#"
{"atMs":0,"entity":{"kind":"portal","id":"p"}}
{"atMs":5,"event":{"eventName":"SetPortalImage","data":{"portalId":"p","imageUrl":"https://cdn.example/broken.png"}}}
"#;
        let lines = replay::parse(text).unwrap();
        let mut replayer = Replayer::new(SpacesConfig::default(), 1.0 / 60.0);
        replayer.textures().fail("https://cdn.example/broken.png");

        let report = replayer.run(&lines, 100).unwrap();
        assert_eq!(report.failed, 0);
        let set = replayer.spaces().set(EntityKind::Portal).borrow();
        assert!(!set.get("p").unwrap().has_content());
    }

    #[test]
    fn settings_drive_replayer() {
        let mut settings = Settings::default();
        settings.frame_rate_hz = 100.0;
        settings.bridge.send_rate_hz = 10.0;

        let replayer = Replayer::new(settings.spaces_config(), settings.frame_dt());
        assert!((replayer.frame_dt() - 0.01).abs() < 1e-6);
        assert_eq!(replayer.spaces().bridge().borrow().config().send_rate_hz, 10.0);
    }

    #[test]
    fn report_serializes_outbound_calls() {
        let text = r#"{"atMs":0,"entity":{"kind":"seatingHotspot","id":"seat-1"}}"#;
        let lines = replay::parse(text).unwrap();
        let mut replayer = Replayer::new(SpacesConfig::default(), 1.0 / 60.0);
        let report = replayer.run(&lines, 0).unwrap();

        let out = report.sent_jsonl();
        let first: serde_json::Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(first["entryPoint"], entry_points::REGISTER_SEATING_HOTSPOT);
        assert_eq!(first["payload"]["id"], "seat-1");
    }
}
