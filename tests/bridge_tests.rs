//! SpacesBridge state synchronization tests (through the `Spaces` context)

#[cfg(test)]
mod tests {
    use futures::executor::LocalPool;
    use serde_json::{json, Value};
    use spaces_bridge::{
        loader::StaticTextureSource,
        protocol::entry_points,
        BridgeConfig, BridgeError, BridgeState, DispatchOutcome, HeadlessRenderLayer, MemorySink,
        Quat, Spaces, SpacesAdapters, SpacesConfig, Transform, Vec3, VisualKind,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        spaces: Spaces,
        sink: MemorySink,
        render: Rc<RefCell<HeadlessRenderLayer>>,
        _pool: LocalPool,
    }

    fn harness_with(bridge: BridgeConfig) -> Harness {
        let pool = LocalPool::new();
        let sink = MemorySink::new();
        let render = Rc::new(RefCell::new(HeadlessRenderLayer::new()));
        let spaces = Spaces::new(
            SpacesAdapters {
                sink: Rc::new(sink.clone()),
                render: render.clone(),
                textures: Rc::new(StaticTextureSource::new()),
                spawner: Rc::new(pool.spawner()),
            },
            SpacesConfig {
                bridge,
                ..Default::default()
            },
        );
        Harness {
            spaces,
            sink,
            render,
            _pool: pool,
        }
    }

    fn harness() -> Harness {
        harness_with(BridgeConfig::default())
    }

    fn send(h: &mut Harness, name: &str, data: Value) -> DispatchOutcome {
        let msg = json!({ "eventName": name, "data": data }).to_string();
        h.spaces.handle_event(&msg)
    }

    fn connect(h: &mut Harness, me: &str) {
        send(
            h,
            "BridgeConnect",
            json!({ "spaceId": "lobby", "instanceId": "i-1", "localActorId": me }),
        );
    }

    fn actor_count(h: &Harness) -> usize {
        h.spaces.bridge().borrow().actor_count()
    }

    fn object_count(h: &Harness) -> usize {
        h.spaces.bridge().borrow().object_count()
    }

    // -----------------------------------------------------------------------
    // Envelope example
    // -----------------------------------------------------------------------

    #[test]
    fn actor_joined_from_string_encoded_envelope() {
        let mut h = harness();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let f = fired.clone();
        h.spaces
            .bridge()
            .borrow_mut()
            .on_actor_joined_listener(move |id, actor| {
                f.borrow_mut().push((id.to_string(), actor.display_name.clone()));
            });

        let out = h.spaces.handle_event(
            r#"{"eventName":"ActorJoined","data":"{\"actorId\":\"a1\",\"displayName\":\"Bob\"}"}"#,
        );
        assert_eq!(out, DispatchOutcome::Delivered);

        let bridge = h.spaces.bridge().borrow();
        let actor = bridge.actor("a1").unwrap();
        assert_eq!(actor.target_position, Vec3::zero());
        assert_eq!(actor.target_rotation, Quat::identity());
        assert_eq!(*fired.borrow(), vec![("a1".to_string(), "Bob".to_string())]);
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_join_is_ignored() {
        let mut h = harness();
        let joins = Rc::new(RefCell::new(0));
        let j = joins.clone();
        h.spaces
            .bridge()
            .borrow_mut()
            .on_actor_joined_listener(move |_, _| *j.borrow_mut() += 1);

        let first = send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        let second = send(
            &mut h,
            "ActorJoined",
            json!({ "actorId": "a1", "displayName": "Bobby" }),
        );

        assert_eq!(first, DispatchOutcome::Delivered);
        assert_eq!(second, DispatchOutcome::Failed);
        assert_eq!(actor_count(&h), 1);
        assert_eq!(*joins.borrow(), 1);
        assert_eq!(h.render.borrow().visual_count(), 1);
        assert_eq!(h.spaces.bridge().borrow().actor("a1").unwrap().display_name, "Bob");
    }

    #[test]
    fn partial_update_leaves_unset_fields() {
        let mut h = harness();
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(
            &mut h,
            "ActorUpdate",
            json!({ "actorId": "a1", "position": { "x": 1.0, "y": 2.0, "z": 3.0 } }),
        );

        {
            let bridge = h.spaces.bridge().borrow();
            let actor = bridge.actor("a1").unwrap();
            assert_eq!(actor.target_position, Vec3::new(1.0, 2.0, 3.0));
            assert_eq!(actor.target_rotation, Quat::identity());
            assert!(actor.current_animation.is_none());
            assert!(!actor.is_speaking);
        }

        send(
            &mut h,
            "ActorUpdate",
            json!({ "actorId": "a1", "animation": "wave", "isSpeaking": true }),
        );
        let bridge = h.spaces.bridge().borrow();
        let actor = bridge.actor("a1").unwrap();
        assert_eq!(actor.target_position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(actor.current_animation.as_deref(), Some("wave"));
        assert!(actor.is_speaking);

        let render = h.render.borrow();
        let visual = render.visual_for("a1").unwrap();
        assert_eq!(visual.animation.as_deref(), Some("wave"));
        assert!(visual.speaking);
    }

    #[test]
    fn update_for_unknown_actor_is_dropped() {
        let mut h = harness();
        let out = send(&mut h, "ActorUpdate", json!({ "actorId": "ghost", "animation": "idle" }));
        assert_eq!(out, DispatchOutcome::Delivered);
        assert_eq!(actor_count(&h), 0);
    }

    #[test]
    fn actor_left_destroys_visual() {
        let mut h = harness();
        let left = Rc::new(RefCell::new(Vec::new()));
        let l = left.clone();
        h.spaces
            .bridge()
            .borrow_mut()
            .on_actor_left_listener(move |id| l.borrow_mut().push(id.to_string()));

        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(&mut h, "ActorLeft", json!({ "actorId": "a1" }));
        send(&mut h, "ActorLeft", json!({ "actorId": "a1" }));

        assert_eq!(actor_count(&h), 0);
        assert_eq!(h.render.borrow().visual_count(), 0);
        assert_eq!(*left.borrow(), vec!["a1".to_string()]);
    }

    #[test]
    fn local_actor_is_not_mirrored() {
        let mut h = harness();
        connect(&mut h, "me");
        send(&mut h, "ActorJoined", json!({ "actorId": "me", "displayName": "Me" }));
        assert_eq!(actor_count(&h), 0);
    }

    #[test]
    fn remote_actors_interpolate_towards_target() {
        let mut h = harness();
        connect(&mut h, "me");
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(
            &mut h,
            "ActorUpdate",
            json!({ "actorId": "a1", "position": { "x": 10.0, "y": 0.0, "z": 0.0 } }),
        );

        // speed 10/s × 0.05 s = halfway
        h.spaces.tick(0.05, None);
        let x = h.spaces.bridge().borrow().actor("a1").unwrap().current_position.x;
        assert!((x - 5.0).abs() < 1e-4, "x = {}", x);

        for _ in 0..200 {
            h.spaces.tick(0.05, None);
        }
        let x = h.spaces.bridge().borrow().actor("a1").unwrap().current_position.x;
        assert!((x - 10.0).abs() < 1e-3);
        let shown = h.render.borrow().visual_for("a1").unwrap().transform.position.x;
        assert_eq!(shown, x);
    }

    #[test]
    fn no_interpolation_while_disconnected() {
        let mut h = harness();
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(
            &mut h,
            "ActorUpdate",
            json!({ "actorId": "a1", "position": { "x": 10.0, "y": 0.0, "z": 0.0 } }),
        );
        h.spaces.tick(0.05, Some(&Transform::default()));

        assert_eq!(h.spaces.bridge().borrow().actor("a1").unwrap().current_position.x, 0.0);
        assert!(h.sink.sent().is_empty());
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn disconnect_empties_tables_and_is_idempotent() {
        let mut h = harness();
        connect(&mut h, "me");
        for i in 0..5 {
            send(
                &mut h,
                "ActorJoined",
                json!({ "actorId": format!("a{}", i), "displayName": "x" }),
            );
            send(
                &mut h,
                "ObjectSpawned",
                json!({ "objectId": format!("o{}", i), "objectType": "ball" }),
            );
        }
        assert_eq!(actor_count(&h), 5);
        assert_eq!(object_count(&h), 5);

        let transitions = Rc::new(RefCell::new(Vec::new()));
        let t = transitions.clone();
        h.spaces
            .bridge()
            .borrow_mut()
            .on_state_changed(move |from, to| t.borrow_mut().push((from, to)));

        send(&mut h, "BridgeDisconnect", json!({ "reason": "bye" }));
        assert_eq!(actor_count(&h), 0);
        assert_eq!(object_count(&h), 0);
        assert_eq!(h.render.borrow().visual_count(), 0);
        assert_eq!(h.spaces.bridge().borrow().state(), BridgeState::Disconnected);
        assert!(h.spaces.bridge().borrow().local_actor_id().is_none());

        let out = send(&mut h, "BridgeDisconnect", json!({}));
        assert_eq!(out, DispatchOutcome::Delivered);
        assert_eq!(
            *transitions.borrow(),
            vec![(BridgeState::Connected, BridgeState::Disconnected)]
        );
    }

    #[test]
    fn state_machine_transitions() {
        let mut h = harness();
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let t = transitions.clone();
        h.spaces
            .bridge()
            .borrow_mut()
            .on_state_changed(move |_, to| t.borrow_mut().push(to));

        send(&mut h, "BridgeConnecting", json!({ "spaceId": "lobby" }));
        connect(&mut h, "me");
        send(&mut h, "BridgeReconnecting", json!({ "reason": "socket closed" }));
        connect(&mut h, "me");
        send(&mut h, "BridgeDisconnect", json!({}));

        assert_eq!(
            *transitions.borrow(),
            vec![
                BridgeState::Connecting,
                BridgeState::Connected,
                BridgeState::Reconnecting,
                BridgeState::Connected,
                BridgeState::Disconnected,
            ]
        );
        let bridge = h.spaces.bridge().borrow();
        assert_eq!(bridge.session().space_id, "");
    }

    #[test]
    fn connect_records_session() {
        let mut h = harness();
        connect(&mut h, "me");
        let bridge = h.spaces.bridge().borrow();
        assert!(bridge.is_connected());
        assert_eq!(bridge.local_actor_id(), Some("me"));
        assert_eq!(bridge.session().space_id, "lobby");
        assert_eq!(bridge.session().instance_id, "i-1");
    }

    #[test]
    fn reconnect_with_same_actor_keeps_tables() {
        let mut h = harness();
        connect(&mut h, "me");
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(&mut h, "ObjectSpawned", json!({ "objectId": "o1", "objectType": "ball" }));

        send(&mut h, "BridgeReconnecting", json!({}));
        assert_eq!(h.spaces.bridge().borrow().state(), BridgeState::Reconnecting);
        assert_eq!(actor_count(&h), 1);

        connect(&mut h, "me");
        assert!(h.spaces.bridge().borrow().is_connected());
        assert_eq!(actor_count(&h), 1);
        assert_eq!(object_count(&h), 1);
    }

    #[test]
    fn reconnect_as_different_actor_clears_tables() {
        let mut h = harness();
        connect(&mut h, "me");
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(&mut h, "ObjectSpawned", json!({ "objectId": "o1", "objectType": "ball" }));

        send(&mut h, "BridgeReconnecting", json!({}));
        connect(&mut h, "someone-else");

        assert!(h.spaces.bridge().borrow().is_connected());
        assert_eq!(h.spaces.bridge().borrow().local_actor_id(), Some("someone-else"));
        assert_eq!(actor_count(&h), 0);
        assert_eq!(object_count(&h), 0);
        assert_eq!(h.render.borrow().visual_count(), 0);
    }

    #[test]
    fn no_sends_while_reconnecting() {
        let mut h = harness();
        connect(&mut h, "me");
        send(&mut h, "BridgeReconnecting", json!({}));
        for _ in 0..10 {
            h.spaces.tick(0.1, Some(&Transform::default()));
        }
        assert_eq!(h.sink.count(entry_points::SEND_LOCAL_TRANSFORM), 0);
    }

    // -----------------------------------------------------------------------
    // Local transform rate limit
    // -----------------------------------------------------------------------

    #[test]
    fn local_transform_capped_at_send_rate() {
        let mut h = harness();
        connect(&mut h, "me");
        let local = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        // 1000 frames in 40 ms of simulated time
        for _ in 0..1000 {
            h.spaces.tick(0.00004, Some(&local));
        }
        assert_eq!(h.sink.count(entry_points::SEND_LOCAL_TRANSFORM), 1);

        // Past the 50 ms window another send is allowed.
        h.spaces.tick(0.02, Some(&local));
        assert_eq!(h.sink.count(entry_points::SEND_LOCAL_TRANSFORM), 2);

        let sent = h.sink.sent_to(entry_points::SEND_LOCAL_TRANSFORM);
        let payload = sent[0].payload();
        assert_eq!(payload["actorId"], "me");
        assert_eq!(payload["position"]["x"], 1.0);
    }

    #[test]
    fn send_cap_holds_across_repeated_connects() {
        let mut h = harness();
        let local = Transform::default();

        connect(&mut h, "me");
        h.spaces.tick(0.001, Some(&local));
        connect(&mut h, "me");
        h.spaces.tick(0.001, Some(&local));
        send(&mut h, "BridgeDisconnect", json!({ "reason": "blip" }));
        connect(&mut h, "me");
        h.spaces.tick(0.001, Some(&local));

        assert!(h.spaces.clock() < 0.05);
        assert_eq!(h.sink.count(entry_points::SEND_LOCAL_TRANSFORM), 1);

        h.spaces.tick(0.05, Some(&local));
        assert_eq!(h.sink.count(entry_points::SEND_LOCAL_TRANSFORM), 2);
    }

    #[test]
    fn join_rotation_is_normalized() {
        let mut h = harness();
        send(
            &mut h,
            "ActorJoined",
            json!({
                "actorId": "a1",
                "displayName": "Bob",
                "rotation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 0.0 }
            }),
        );
        send(
            &mut h,
            "ObjectSpawned",
            json!({
                "objectId": "o1",
                "objectType": "chair",
                "ownerId": "a1",
                "rotation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 2.0 }
            }),
        );

        let bridge = h.spaces.bridge().borrow();
        let actor = bridge.actor("a1").unwrap();
        assert_eq!(actor.target_rotation, Quat::identity());
        assert_eq!(actor.current_rotation, Quat::identity());
        let object = bridge.object("o1").unwrap();
        assert!((object.transform.rotation.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn one_second_at_60fps_sends_about_20() {
        let mut h = harness();
        connect(&mut h, "me");
        for _ in 0..60 {
            h.spaces.tick(1.0 / 60.0, Some(&Transform::default()));
        }
        let n = h.sink.count(entry_points::SEND_LOCAL_TRANSFORM);
        assert!((15..=20).contains(&n), "sent {}", n);
    }

    // -----------------------------------------------------------------------
    // Networked objects
    // -----------------------------------------------------------------------

    #[test]
    fn object_scale_only_update() {
        let mut h = harness();
        send(
            &mut h,
            "ObjectSpawned",
            json!({
                "objectId": "obj1",
                "objectType": "crate",
                "ownerId": "a1",
                "position": { "x": 1.0, "y": 2.0, "z": 3.0 },
                "rotation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 },
                "state": { "open": false }
            }),
        );
        send(
            &mut h,
            "ObjectUpdate",
            json!({ "objectId": "obj1", "scale": { "x": 2.0, "y": 2.0, "z": 2.0 } }),
        );

        let bridge = h.spaces.bridge().borrow();
        let obj = bridge.object("obj1").unwrap();
        assert_eq!(obj.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(obj.transform.rotation, Quat::identity());
        assert_eq!(obj.transform.scale, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(obj.owner_id.as_deref(), Some("a1"));
        assert_eq!(obj.state, json!({ "open": false }));

        let render = h.render.borrow();
        assert_eq!(render.visual_for("obj1").unwrap().transform.scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn object_prefab_resolution() {
        let mut config = BridgeConfig::default();
        config.object_prefabs.insert("chair".into(), "ChairPrefab".into());
        let mut h = harness_with(config);

        send(
            &mut h,
            "ObjectSpawned",
            json!({ "objectId": "c", "objectType": "chair", "prefabId": "Other" }),
        );
        send(
            &mut h,
            "ObjectSpawned",
            json!({ "objectId": "t", "objectType": "table", "prefabId": "TablePrefab" }),
        );
        send(&mut h, "ObjectSpawned", json!({ "objectId": "x", "objectType": "unknown" }));

        let render = h.render.borrow();
        assert_eq!(render.visual_for("c").unwrap().kind, VisualKind::Prefab("ChairPrefab".into()));
        assert_eq!(render.visual_for("t").unwrap().kind, VisualKind::Prefab("TablePrefab".into()));
        assert_eq!(render.visual_for("x").unwrap().kind, VisualKind::Capsule);
    }

    #[test]
    fn duplicate_spawn_and_despawn() {
        let mut h = harness();
        send(&mut h, "ObjectSpawned", json!({ "objectId": "o1", "objectType": "ball" }));
        let dup = send(&mut h, "ObjectSpawned", json!({ "objectId": "o1", "objectType": "ball" }));
        assert_eq!(dup, DispatchOutcome::Failed);
        assert_eq!(object_count(&h), 1);

        send(&mut h, "ObjectDespawned", json!({ "objectId": "o1" }));
        assert_eq!(object_count(&h), 0);
        assert_eq!(h.render.borrow().visual_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Unknown events
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_event_does_not_touch_tables() {
        let mut h = harness();
        send(&mut h, "ActorJoined", json!({ "actorId": "a1", "displayName": "Bob" }));
        send(&mut h, "ObjectSpawned", json!({ "objectId": "o1", "objectType": "ball" }));

        let out = h.spaces.process_event("TotallyUnknown", r#"{"actorId":"a1"}"#);
        assert_eq!(out, DispatchOutcome::Unhandled);
        assert_eq!(actor_count(&h), 1);
        assert_eq!(object_count(&h), 1);
    }

    // -----------------------------------------------------------------------
    // Requests to the host
    // -----------------------------------------------------------------------

    #[test]
    fn requests_require_connection() {
        let h = harness();
        let bridge = h.spaces.bridge().borrow();
        assert!(matches!(
            bridge.request_spawn("ball", Vec3::zero(), Quat::identity(), None),
            Err(BridgeError::NotConnected)
        ));
        assert!(matches!(bridge.request_despawn("o1"), Err(BridgeError::NotConnected)));
        assert!(matches!(bridge.request_ownership("o1"), Err(BridgeError::NotConnected)));
        assert!(h.sink.sent().is_empty());
    }

    #[test]
    fn requests_reach_host_entry_points() {
        let mut h = harness();
        connect(&mut h, "me");
        {
            let bridge = h.spaces.bridge().borrow();
            bridge
                .request_spawn(
                    "ball",
                    Vec3::new(0.0, 1.0, 0.0),
                    Quat::identity(),
                    Some("BallPrefab"),
                )
                .unwrap();
            bridge.request_despawn("o9").unwrap();
            bridge.request_ownership("o9").unwrap();
            bridge.send_custom_event("wave", json!({ "to": "all" })).unwrap();
        }

        let spawn = &h.sink.sent_to(entry_points::REQUEST_SPAWN)[0];
        assert_eq!(spawn.payload()["objectType"], "ball");
        assert_eq!(spawn.payload()["prefabId"], "BallPrefab");

        let own = &h.sink.sent_to(entry_points::REQUEST_OWNERSHIP)[0];
        assert_eq!(own.payload()["requesterId"], "me");
        assert_eq!(own.payload()["objectId"], "o9");

        assert_eq!(h.sink.count(entry_points::REQUEST_DESPAWN), 1);
        let custom = &h.sink.sent_to(entry_points::SEND_CUSTOM_EVENT)[0];
        assert_eq!(custom.payload()["eventName"], "wave");
        assert_eq!(custom.payload()["data"]["to"], "all");
    }
}
