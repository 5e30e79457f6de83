//! `SpacesBridge`: mirror of host-authoritative actors and objects.
//!
//! ## State machine
//!
//! ```text
//!                 BridgeConnecting          BridgeConnect
//! Disconnected ───────────────────▶ Connecting ─────────▶ Connected
//!      ▲                                                   │    ▲
//!      │ BridgeDisconnect (from any state, clears tables)  │    │ BridgeConnect
//!      └───────────────────────────────────────────────────┘    │
//!                                       BridgeReconnecting ▼    │
//!                                                    Reconnecting
//! ```
//!
//! While Reconnecting the tables are kept but interpolation and local sends
//! pause. Reconnecting as a different local actor clears the tables.
//!
//! Everything runs on the render thread; listeners are invoked while the
//! bridge is mutably borrowed, so they must not call back into it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::emitter::Emitter;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{
    self, events, CustomEvent, DespawnRequest, LocalTransform, OwnershipRequest, SpawnRequest,
};
use crate::registry::EventRegistry;
use crate::render::{RenderLayer, VisualHandle, VisualKind};
use crate::types::{BridgeConfig, Quat, Transform, Vec3};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone)]
pub struct RemoteActor {
    pub actor_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub target_position: Vec3,
    pub target_rotation: Quat,
    pub current_animation: Option<String>,
    pub is_speaking: bool,
    /// Locally interpolated transform actually shown.
    pub current_position: Vec3,
    pub current_rotation: Quat,
    pub visual: VisualHandle,
}

#[derive(Debug, Clone)]
pub struct NetworkedObject {
    pub object_id: String,
    pub object_type: String,
    pub owner_id: Option<String>,
    pub prefab_id: Option<String>,
    pub state: serde_json::Value,
    pub transform: Transform,
    pub visual: VisualHandle,
}

#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub space_id: String,
    pub instance_id: String,
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

type StateListener = Box<dyn FnMut(BridgeState, BridgeState)>;
type ActorListener = Box<dyn FnMut(&str, &RemoteActor)>;
type ObjectListener = Box<dyn FnMut(&str, &NetworkedObject)>;
type IdListener = Box<dyn FnMut(&str)>;

/// Fan-out delegates. Any number of subscribers per event.
#[derive(Default)]
pub struct BridgeListeners {
    state_changed: Vec<StateListener>,
    actor_joined: Vec<ActorListener>,
    actor_left: Vec<IdListener>,
    object_spawned: Vec<ObjectListener>,
    object_despawned: Vec<IdListener>,
}

// ---------------------------------------------------------------------------
// SpacesBridge
// ---------------------------------------------------------------------------

pub struct SpacesBridge {
    config: BridgeConfig,
    state: BridgeState,
    local_actor_id: Option<String>,
    session: SessionInfo,
    actors: HashMap<String, RemoteActor>,
    objects: HashMap<String, NetworkedObject>,
    render: Rc<RefCell<dyn RenderLayer>>,
    emitter: Emitter,
    listeners: BridgeListeners,
    /// Time of the last local-transform send; `None` until the first.
    /// Survives lifecycle events so the rate cap holds across reconnects.
    last_send_at: Option<f64>,
    sends: u64,
}

impl SpacesBridge {
    pub fn new(
        config: BridgeConfig,
        render: Rc<RefCell<dyn RenderLayer>>,
        emitter: Emitter,
    ) -> Self {
        Self {
            config,
            state: BridgeState::Disconnected,
            local_actor_id: None,
            session: SessionInfo::default(),
            actors: HashMap::new(),
            objects: HashMap::new(),
            render,
            emitter,
            listeners: BridgeListeners::default(),
            last_send_at: None,
            sends: 0,
        }
    }

    /// Register this bridge's event handlers on `registry`.
    pub fn install(bridge: &Rc<RefCell<SpacesBridge>>, registry: &mut EventRegistry) {
        let b = bridge.clone();
        registry.register_typed(events::BRIDGE_CONNECTING, move |m: protocol::BridgeConnecting| {
            b.borrow_mut().on_connecting(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(events::BRIDGE_CONNECT, move |m: protocol::BridgeConnect| {
            b.borrow_mut().on_connect(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(
            events::BRIDGE_RECONNECTING,
            move |m: protocol::BridgeReconnecting| {
                b.borrow_mut().on_reconnecting(m);
                Ok(())
            },
        );
        let b = bridge.clone();
        registry.register_typed(events::BRIDGE_DISCONNECT, move |m: protocol::BridgeDisconnect| {
            b.borrow_mut().on_disconnect(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(events::ACTOR_JOINED, move |m: protocol::ActorJoined| {
            b.borrow_mut().on_actor_joined(m)
        });
        let b = bridge.clone();
        registry.register_typed(events::ACTOR_UPDATE, move |m: protocol::ActorUpdate| {
            b.borrow_mut().on_actor_update(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(events::ACTOR_LEFT, move |m: protocol::ActorLeft| {
            b.borrow_mut().on_actor_left(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(events::OBJECT_SPAWNED, move |m: protocol::ObjectSpawned| {
            b.borrow_mut().on_object_spawned(m)
        });
        let b = bridge.clone();
        registry.register_typed(events::OBJECT_UPDATE, move |m: protocol::ObjectUpdate| {
            b.borrow_mut().on_object_update(m);
            Ok(())
        });
        let b = bridge.clone();
        registry.register_typed(events::OBJECT_DESPAWNED, move |m: protocol::ObjectDespawned| {
            b.borrow_mut().on_object_despawned(m);
            Ok(())
        });
    }

    /// Event names handled by [`SpacesBridge::install`].
    pub fn event_names() -> &'static [&'static str] {
        &[
            events::BRIDGE_CONNECTING,
            events::BRIDGE_CONNECT,
            events::BRIDGE_RECONNECTING,
            events::BRIDGE_DISCONNECT,
            events::ACTOR_JOINED,
            events::ACTOR_UPDATE,
            events::ACTOR_LEFT,
            events::OBJECT_SPAWNED,
            events::OBJECT_UPDATE,
            events::OBJECT_DESPAWNED,
        ]
    }

    // ------------------------------------------------------------------
    // Listener registration
    // ------------------------------------------------------------------

    pub fn on_state_changed(&mut self, f: impl FnMut(BridgeState, BridgeState) + 'static) {
        self.listeners.state_changed.push(Box::new(f));
    }

    pub fn on_actor_joined_listener(&mut self, f: impl FnMut(&str, &RemoteActor) + 'static) {
        self.listeners.actor_joined.push(Box::new(f));
    }

    pub fn on_actor_left_listener(&mut self, f: impl FnMut(&str) + 'static) {
        self.listeners.actor_left.push(Box::new(f));
    }

    pub fn on_object_spawned_listener(&mut self, f: impl FnMut(&str, &NetworkedObject) + 'static) {
        self.listeners.object_spawned.push(Box::new(f));
    }

    pub fn on_object_despawned_listener(&mut self, f: impl FnMut(&str) + 'static) {
        self.listeners.object_despawned.push(Box::new(f));
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == BridgeState::Connected
    }

    pub fn local_actor_id(&self) -> Option<&str> {
        self.local_actor_id.as_deref()
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn actor(&self, actor_id: &str) -> Option<&RemoteActor> {
        self.actors.get(actor_id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &RemoteActor> {
        self.actors.values()
    }

    pub fn object(&self, object_id: &str) -> Option<&NetworkedObject> {
        self.objects.get(object_id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &NetworkedObject> {
        self.objects.values()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of local-transform messages sent so far.
    pub fn sends(&self) -> u64 {
        self.sends
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    pub fn on_connecting(&mut self, msg: protocol::BridgeConnecting) {
        if self.state != BridgeState::Disconnected {
            log::debug!("[bridge] Ignoring BridgeConnecting in state {:?}", self.state);
            return;
        }
        if let Some(space) = msg.space_id {
            self.session.space_id = space;
        }
        self.set_state(BridgeState::Connecting);
    }

    pub fn on_connect(&mut self, msg: protocol::BridgeConnect) {
        let resuming = self.state == BridgeState::Reconnecting;
        let same_actor = self.local_actor_id.as_deref() == Some(msg.local_actor_id.as_str());

        if resuming && !same_actor {
            log::info!(
                "[bridge] Reconnected as '{}' (was {:?}), dropping mirrored state",
                msg.local_actor_id,
                self.local_actor_id
            );
            self.clear_tables();
        }

        // Never mirror ourselves.
        if let Some(actor) = self.actors.remove(&msg.local_actor_id) {
            self.render.borrow_mut().destroy_visual(actor.visual);
        }

        log::info!(
            "[bridge] Connected to space '{}' instance '{}' as '{}'",
            msg.space_id,
            msg.instance_id,
            msg.local_actor_id
        );
        self.session = SessionInfo {
            space_id: msg.space_id,
            instance_id: msg.instance_id,
        };
        self.local_actor_id = Some(msg.local_actor_id);
        self.set_state(BridgeState::Connected);
    }

    pub fn on_reconnecting(&mut self, msg: protocol::BridgeReconnecting) {
        if self.state != BridgeState::Connected {
            log::debug!("[bridge] Ignoring BridgeReconnecting in state {:?}", self.state);
            return;
        }
        log::warn!(
            "[bridge] Reconnecting: {}",
            msg.reason.as_deref().unwrap_or("no reason given")
        );
        self.set_state(BridgeState::Reconnecting);
    }

    pub fn on_disconnect(&mut self, msg: protocol::BridgeDisconnect) {
        if self.state == BridgeState::Disconnected
            && self.actors.is_empty()
            && self.objects.is_empty()
        {
            log::debug!("[bridge] Already disconnected");
            return;
        }
        log::info!(
            "[bridge] Disconnected: {}",
            msg.reason.as_deref().unwrap_or("no reason given")
        );
        self.clear_tables();
        self.local_actor_id = None;
        self.session = SessionInfo::default();
        self.set_state(BridgeState::Disconnected);
    }

    /// Tear down for context shutdown: behaves like a disconnect, then drops
    /// every listener.
    pub fn reset(&mut self) {
        self.on_disconnect(protocol::BridgeDisconnect {
            reason: Some("shutdown".into()),
        });
        self.listeners = BridgeListeners::default();
    }

    fn clear_tables(&mut self) {
        let mut render = self.render.borrow_mut();
        for (_, actor) in self.actors.drain() {
            render.destroy_visual(actor.visual);
        }
        for (_, object) in self.objects.drain() {
            render.destroy_visual(object.visual);
        }
    }

    fn set_state(&mut self, next: BridgeState) {
        let prev = self.state;
        if prev == next {
            return;
        }
        self.state = next;
        log::debug!("[bridge] {:?} → {:?}", prev, next);
        for f in self.listeners.state_changed.iter_mut() {
            f(prev, next);
        }
    }

    // ------------------------------------------------------------------
    // Actors
    // ------------------------------------------------------------------

    pub fn on_actor_joined(&mut self, msg: protocol::ActorJoined) -> BridgeResult<()> {
        if self.local_actor_id.as_deref() == Some(msg.actor_id.as_str()) {
            log::debug!("[bridge] Ignoring ActorJoined for local actor '{}'", msg.actor_id);
            return Ok(());
        }
        if self.actors.contains_key(&msg.actor_id) {
            return Err(BridgeError::DuplicateEntity {
                kind: "actor",
                id: msg.actor_id,
            });
        }

        let position = msg.position.unwrap_or_default();
        let rotation = msg.rotation.unwrap_or_default().normalized();
        let transform = Transform::new(position, rotation, Vec3::one());
        let visual = self.render.borrow_mut().spawn_visual(
            &msg.actor_id,
            VisualKind::from_prefab(self.config.actor_prefab.as_deref()),
            &transform,
        );

        let actor = RemoteActor {
            actor_id: msg.actor_id.clone(),
            display_name: msg.display_name,
            avatar_url: msg.avatar_url,
            target_position: position,
            target_rotation: rotation,
            current_animation: None,
            is_speaking: false,
            current_position: position,
            current_rotation: rotation,
            visual,
        };
        log::info!("[bridge] Actor '{}' joined ({})", actor.actor_id, actor.display_name);

        let id = msg.actor_id;
        self.actors.insert(id.clone(), actor);
        if let Some(actor) = self.actors.get(&id) {
            for f in self.listeners.actor_joined.iter_mut() {
                f(&id, actor);
            }
        }
        Ok(())
    }

    pub fn on_actor_update(&mut self, msg: protocol::ActorUpdate) {
        if self.local_actor_id.as_deref() == Some(msg.actor_id.as_str()) {
            return;
        }
        let Some(actor) = self.actors.get_mut(&msg.actor_id) else {
            log::debug!("[bridge] ActorUpdate for unknown actor '{}'", msg.actor_id);
            return;
        };

        if let Some(p) = msg.position {
            actor.target_position = p;
        }
        if let Some(r) = msg.rotation {
            actor.target_rotation = r.normalized();
        }
        let mut render = self.render.borrow_mut();
        if let Some(anim) = msg.animation {
            render.set_animation(actor.visual, &anim);
            actor.current_animation = Some(anim);
        }
        if let Some(speaking) = msg.is_speaking {
            render.set_speaking(actor.visual, speaking);
            actor.is_speaking = speaking;
        }
    }

    pub fn on_actor_left(&mut self, msg: protocol::ActorLeft) {
        let Some(actor) = self.actors.remove(&msg.actor_id) else {
            return;
        };
        self.render.borrow_mut().destroy_visual(actor.visual);
        log::info!("[bridge] Actor '{}' left", msg.actor_id);
        for f in self.listeners.actor_left.iter_mut() {
            f(&msg.actor_id);
        }
    }

    // ------------------------------------------------------------------
    // Networked objects
    // ------------------------------------------------------------------

    pub fn on_object_spawned(&mut self, msg: protocol::ObjectSpawned) -> BridgeResult<()> {
        if self.objects.contains_key(&msg.object_id) {
            return Err(BridgeError::DuplicateEntity {
                kind: "object",
                id: msg.object_id,
            });
        }

        let transform = Transform::new(
            msg.position.unwrap_or_default(),
            msg.rotation.unwrap_or_default().normalized(),
            msg.scale.unwrap_or_else(Vec3::one),
        );
        let prefab = self
            .config
            .object_prefabs
            .get(&msg.object_type)
            .map(String::as_str)
            .or(msg.prefab_id.as_deref());
        let visual = self.render.borrow_mut().spawn_visual(
            &msg.object_id,
            VisualKind::from_prefab(prefab),
            &transform,
        );

        let object = NetworkedObject {
            object_id: msg.object_id.clone(),
            object_type: msg.object_type,
            owner_id: msg.owner_id,
            prefab_id: msg.prefab_id,
            state: msg.state,
            transform,
            visual,
        };
        log::info!("[bridge] Object '{}' ({}) spawned", object.object_id, object.object_type);

        let id = msg.object_id;
        self.objects.insert(id.clone(), object);
        if let Some(object) = self.objects.get(&id) {
            for f in self.listeners.object_spawned.iter_mut() {
                f(&id, object);
            }
        }
        Ok(())
    }

    pub fn on_object_update(&mut self, msg: protocol::ObjectUpdate) {
        let Some(object) = self.objects.get_mut(&msg.object_id) else {
            log::debug!("[bridge] ObjectUpdate for unknown object '{}'", msg.object_id);
            return;
        };

        let mut moved = false;
        if let Some(p) = msg.position {
            object.transform.position = p;
            moved = true;
        }
        if let Some(r) = msg.rotation {
            object.transform.rotation = r.normalized();
            moved = true;
        }
        if let Some(s) = msg.scale {
            object.transform.scale = s;
            moved = true;
        }
        if let Some(owner) = msg.owner_id {
            object.owner_id = Some(owner);
        }
        if let Some(state) = msg.state {
            object.state = state;
        }
        if moved {
            self.render
                .borrow_mut()
                .set_visual_transform(object.visual, &object.transform);
        }
    }

    pub fn on_object_despawned(&mut self, msg: protocol::ObjectDespawned) {
        let Some(object) = self.objects.remove(&msg.object_id) else {
            return;
        };
        self.render.borrow_mut().destroy_visual(object.visual);
        log::info!("[bridge] Object '{}' despawned", msg.object_id);
        for f in self.listeners.object_despawned.iter_mut() {
            f(&msg.object_id);
        }
    }

    // ------------------------------------------------------------------
    // Per-frame
    // ------------------------------------------------------------------

    /// Advance one frame.
    ///
    /// `dt` is the frame delta and `now` a monotonic clock, both in seconds.
    /// `local` is the local actor's current transform, if there is one.
    pub fn update(&mut self, dt: f32, now: f64, local: Option<&Transform>) {
        if self.state != BridgeState::Connected {
            return;
        }

        self.interpolate(dt);

        if let Some(t) = local {
            self.maybe_send_local(now, t);
        }
    }

    fn interpolate(&mut self, dt: f32) {
        let tp = (self.config.position_lerp_speed * dt).clamp(0.0, 1.0);
        let tr = (self.config.rotation_lerp_speed * dt).clamp(0.0, 1.0);
        let mut render = self.render.borrow_mut();

        for actor in self.actors.values_mut() {
            actor.current_position = actor.current_position.lerp(actor.target_position, tp);
            actor.current_rotation = actor.current_rotation.slerp(actor.target_rotation, tr);
            render.set_visual_transform(
                actor.visual,
                &Transform::new(actor.current_position, actor.current_rotation, Vec3::one()),
            );
        }
    }

    fn maybe_send_local(&mut self, now: f64, local: &Transform) {
        let Some(actor_id) = self.local_actor_id.clone() else {
            return;
        };
        if let Some(last) = self.last_send_at {
            if now - last < self.config.send_interval() {
                return;
            }
        }

        let msg = LocalTransform {
            actor_id,
            position: local.position,
            rotation: local.rotation,
        };
        match self.emitter.send_local_transform(&msg) {
            Ok(()) => {
                self.last_send_at = Some(now);
                self.sends += 1;
            }
            Err(e) => log::warn!("[bridge] Failed to send local transform: {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Requests to the host
    // ------------------------------------------------------------------

    fn ensure_connected(&self) -> BridgeResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    pub fn request_spawn(
        &self,
        object_type: &str,
        position: Vec3,
        rotation: Quat,
        prefab_id: Option<&str>,
    ) -> BridgeResult<()> {
        self.ensure_connected()?;
        self.emitter.request_spawn(&SpawnRequest {
            object_type: object_type.to_string(),
            position,
            rotation,
            prefab_id: prefab_id.map(str::to_string),
        })
    }

    pub fn request_despawn(&self, object_id: &str) -> BridgeResult<()> {
        self.ensure_connected()?;
        self.emitter.request_despawn(&DespawnRequest {
            object_id: object_id.to_string(),
        })
    }

    /// Ask the host to transfer ownership of `object_id` to the local actor.
    pub fn request_ownership(&self, object_id: &str) -> BridgeResult<()> {
        self.ensure_connected()?;
        let requester_id = self.local_actor_id.clone().ok_or(BridgeError::NotConnected)?;
        self.emitter.request_ownership(&OwnershipRequest {
            object_id: object_id.to_string(),
            requester_id,
        })
    }

    pub fn send_custom_event(&self, event_name: &str, data: serde_json::Value) -> BridgeResult<()> {
        self.ensure_connected()?;
        self.emitter.send_custom_event(&CustomEvent {
            event_name: event_name.to_string(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::MemorySink;
    use crate::render::HeadlessRenderLayer;

    fn bridge() -> (SpacesBridge, Rc<RefCell<HeadlessRenderLayer>>, MemorySink) {
        let render = Rc::new(RefCell::new(HeadlessRenderLayer::new()));
        let sink = MemorySink::new();
        let b = SpacesBridge::new(
            BridgeConfig::default(),
            render.clone(),
            Emitter::new(Rc::new(sink.clone())),
        );
        (b, render, sink)
    }

    fn connect(b: &mut SpacesBridge, me: &str) {
        b.on_connect(protocol::BridgeConnect {
            space_id: "space".into(),
            instance_id: "inst".into(),
            local_actor_id: me.into(),
        });
    }

    fn join(b: &mut SpacesBridge, id: &str) -> BridgeResult<()> {
        b.on_actor_joined(protocol::ActorJoined {
            actor_id: id.into(),
            display_name: id.to_uppercase(),
            avatar_url: None,
            position: None,
            rotation: None,
        })
    }

    #[test]
    fn local_actor_is_never_mirrored() {
        let (mut b, render, _) = bridge();
        connect(&mut b, "me");
        join(&mut b, "me").unwrap();
        assert_eq!(b.actor_count(), 0);
        assert_eq!(render.borrow().visual_count(), 0);
    }

    #[test]
    fn connect_evicts_existing_entry_for_local_id() {
        let (mut b, render, _) = bridge();
        join(&mut b, "me").unwrap();
        assert_eq!(b.actor_count(), 1);
        connect(&mut b, "me");
        assert_eq!(b.actor_count(), 0);
        assert_eq!(render.borrow().visual_count(), 0);
    }

    #[test]
    fn capsule_fallback_without_prefab() {
        let (mut b, render, _) = bridge();
        connect(&mut b, "me");
        join(&mut b, "a1").unwrap();
        let r = render.borrow();
        assert_eq!(r.visual_for("a1").unwrap().kind, VisualKind::Capsule);
    }

    #[test]
    fn interpolation_converges_on_target() {
        let (mut b, _, _) = bridge();
        connect(&mut b, "me");
        join(&mut b, "a1").unwrap();
        b.on_actor_update(protocol::ActorUpdate {
            actor_id: "a1".into(),
            position: Some(Vec3::new(10.0, 0.0, 0.0)),
            ..Default::default()
        });

        // One step at speed 10, dt 0.05 → halfway.
        b.update(0.05, 0.0, None);
        let x = b.actor("a1").unwrap().current_position.x;
        assert!((x - 5.0).abs() < 1e-4);

        for i in 1..200 {
            b.update(0.016, i as f64 * 0.016, None);
        }
        let x = b.actor("a1").unwrap().current_position.x;
        assert!((x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn no_interpolation_while_reconnecting() {
        let (mut b, _, _) = bridge();
        connect(&mut b, "me");
        join(&mut b, "a1").unwrap();
        b.on_actor_update(protocol::ActorUpdate {
            actor_id: "a1".into(),
            position: Some(Vec3::new(10.0, 0.0, 0.0)),
            ..Default::default()
        });
        b.on_reconnecting(protocol::BridgeReconnecting::default());
        b.update(0.05, 0.0, Some(&Transform::default()));
        assert_eq!(b.actor("a1").unwrap().current_position, Vec3::zero());
        assert_eq!(b.sends(), 0);
    }

    #[test]
    fn requests_require_connection() {
        let (b, _, sink) = bridge();
        assert!(matches!(b.request_despawn("o1"), Err(BridgeError::NotConnected)));
        assert!(sink.sent().is_empty());
    }
}
