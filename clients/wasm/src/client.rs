//! `SpacesClient`: the primary wasm-bindgen export.
//!
//! ## JavaScript usage
//!
//! ```js
//! import init, { SpacesClient } from './pkg/spaces_bridge_wasm.js';
//!
//! await init();
//!
//! const spaces = new SpacesClient(JSON.stringify({ send_rate_hz: 20 }));
//!
//! spaces.onSpawnVisual((handle, key, prefab, px, py, pz, rx, ry, rz, rw, sx, sy, sz) => {
//!   scene.spawn(handle, prefab ?? 'capsule', [px, py, pz], [rx, ry, rz, rw]);
//! });
//! spaces.onEntityTexture((kind, id, objectUrl) => {
//!   scene.setTexture(kind, id, objectUrl);
//! });
//!
//! // The host delivers events here:
//! window.SpacesHandleEvent = (json) => spaces.handleEvent(json);
//!
//! // In your render loop:
//! function tick(dt) {
//!   const p = player.position, q = player.quaternion;
//!   spaces.tick(dt, p.x, p.y, p.z, q.x, q.y, q.z, q.w);
//!   requestAnimationFrame(tick);
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use spaces_bridge::{
    hotspots, BridgeConfig, ClickAction, ClickSource, DispatchOutcome, EntityKind, Quat, Spaces,
    SpacesAdapters, SpacesConfig, Transform, Vec3,
};
use wasm_bindgen::prelude::*;

use crate::host::WindowHostSink;
use crate::render::{call_fn, JsRenderLayer};
use crate::textures::{FetchTextureSource, WasmSpawner};

// ---------------------------------------------------------------------------
// SpacesClient
// ---------------------------------------------------------------------------

/// Primary Wasm API object.
///
/// Instantiate with `new SpacesClient(configJson?)`, register render
/// callbacks, forward host events to `handleEvent`, call `tick` each frame.
#[wasm_bindgen]
pub struct SpacesClient {
    spaces: Spaces,
    render: Rc<RefCell<JsRenderLayer>>,
}

#[wasm_bindgen]
impl SpacesClient {
    // -----------------------------------------------------------------------
    // Constructor
    // -----------------------------------------------------------------------

    /// Create a new client.
    ///
    /// @param configJson - optional bridge settings, e.g.
    ///   `{"send_rate_hz":20,"actor_prefab":"Avatar"}`
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SpacesClient, JsValue> {
        let bridge: BridgeConfig = match config_json.as_deref() {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
                .map_err(|e| JsValue::from_str(&format!("invalid config: {}", e)))?,
            _ => BridgeConfig::default(),
        };

        let render = Rc::new(RefCell::new(JsRenderLayer::new()));
        let spaces = Spaces::new(
            SpacesAdapters {
                sink: Rc::new(WindowHostSink::new()),
                render: render.clone(),
                textures: Rc::new(FetchTextureSource),
                spawner: Rc::new(WasmSpawner),
            },
            SpacesConfig {
                bridge,
                ..Default::default()
            },
        );
        Ok(Self { spaces, render })
    }

    // -----------------------------------------------------------------------
    // Host ingress / frame loop
    // -----------------------------------------------------------------------

    /// Deliver one host message (`{"eventName":..,"data":..}`).
    ///
    /// Returns `"delivered"`, `"unhandled"` or `"failed"`; never throws.
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&mut self, message: &str) -> String {
        outcome_name(self.spaces.handle_event(message)).to_string()
    }

    /// Advance one frame with the local actor's transform.
    #[wasm_bindgen]
    #[allow(clippy::too_many_arguments)]
    pub fn tick(&mut self, dt: f32, px: f32, py: f32, pz: f32, rx: f32, ry: f32, rz: f32, rw: f32) {
        let local = Transform::new(Vec3::new(px, py, pz), Quat::new(rx, ry, rz, rw), Vec3::one());
        self.spaces.tick(dt, Some(&local));
    }

    /// Advance one frame without a local actor (spectator / loading).
    #[wasm_bindgen(js_name = tickIdle)]
    pub fn tick_idle(&mut self, dt: f32) {
        self.spaces.tick(dt, None);
    }

    /// Tear everything down. The client is inert afterwards.
    #[wasm_bindgen]
    pub fn shutdown(&mut self) {
        self.spaces.shutdown();
    }

    // -----------------------------------------------------------------------
    // Render callbacks
    // -----------------------------------------------------------------------

    /// `callback(handle, key, prefab: string | null, px, py, pz, rx, ry, rz, rw, sx, sy, sz)`
    #[wasm_bindgen(js_name = onSpawnVisual)]
    pub fn on_spawn_visual(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.spawn_visual = Some(cb);
    }

    /// `callback(handle, px, py, pz, rx, ry, rz, rw, sx, sy, sz)`
    #[wasm_bindgen(js_name = onVisualTransform)]
    pub fn on_visual_transform(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.visual_transform = Some(cb);
    }

    /// `callback(handle)`
    #[wasm_bindgen(js_name = onDestroyVisual)]
    pub fn on_destroy_visual(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.destroy_visual = Some(cb);
    }

    /// `callback(handle, animation: string)`
    #[wasm_bindgen(js_name = onAnimation)]
    pub fn on_animation(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.animation = Some(cb);
    }

    /// `callback(handle, speaking: boolean)`
    #[wasm_bindgen(js_name = onSpeaking)]
    pub fn on_speaking(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.speaking = Some(cb);
    }

    /// `callback(kind: string, id: string, objectUrl: string | null)`
    #[wasm_bindgen(js_name = onEntityTexture)]
    pub fn on_entity_texture(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.entity_texture = Some(cb);
    }

    /// `callback(kind: string, id: string, px, py, pz, rx, ry, rz, rw, sx, sy, sz)`
    #[wasm_bindgen(js_name = onEntityTransform)]
    pub fn on_entity_transform(&mut self, cb: js_sys::Function) {
        self.render.borrow_mut().callbacks.entity_transform = Some(cb);
    }

    // -----------------------------------------------------------------------
    // Bridge callbacks
    // -----------------------------------------------------------------------

    /// `callback(from: string, to: string)`: `"Disconnected"` | `"Connecting"` | `"Connected"` | `"Reconnecting"`
    #[wasm_bindgen(js_name = onStateChanged)]
    pub fn on_state_changed(&mut self, cb: js_sys::Function) {
        let cb = Some(cb);
        self.spaces.bridge().borrow_mut().on_state_changed(move |from, to| {
            call_fn(
                &cb,
                &[
                    JsValue::from_str(&format!("{:?}", from)),
                    JsValue::from_str(&format!("{:?}", to)),
                ],
            );
        });
    }

    /// `callback(actorId: string, displayName: string, avatarUrl: string | null)`
    #[wasm_bindgen(js_name = onActorJoined)]
    pub fn on_actor_joined(&mut self, cb: js_sys::Function) {
        let cb = Some(cb);
        self.spaces
            .bridge()
            .borrow_mut()
            .on_actor_joined_listener(move |id, actor| {
                let avatar = actor
                    .avatar_url
                    .as_deref()
                    .map(JsValue::from_str)
                    .unwrap_or(JsValue::NULL);
                call_fn(
                    &cb,
                    &[JsValue::from_str(id), JsValue::from_str(&actor.display_name), avatar],
                );
            });
    }

    /// `callback(actorId: string)`
    #[wasm_bindgen(js_name = onActorLeft)]
    pub fn on_actor_left(&mut self, cb: js_sys::Function) {
        let cb = Some(cb);
        self.spaces
            .bridge()
            .borrow_mut()
            .on_actor_left_listener(move |id| call_fn(&cb, &[JsValue::from_str(id)]));
    }

    /// `callback(objectId: string, objectType: string, stateJson: string)`
    #[wasm_bindgen(js_name = onObjectSpawned)]
    pub fn on_object_spawned(&mut self, cb: js_sys::Function) {
        let cb = Some(cb);
        self.spaces
            .bridge()
            .borrow_mut()
            .on_object_spawned_listener(move |id, object| {
                call_fn(
                    &cb,
                    &[
                        JsValue::from_str(id),
                        JsValue::from_str(&object.object_type),
                        JsValue::from_str(&object.state.to_string()),
                    ],
                );
            });
    }

    /// `callback(objectId: string)`
    #[wasm_bindgen(js_name = onObjectDespawned)]
    pub fn on_object_despawned(&mut self, cb: js_sys::Function) {
        let cb = Some(cb);
        self.spaces
            .bridge()
            .borrow_mut()
            .on_object_despawned_listener(move |id| call_fn(&cb, &[JsValue::from_str(id)]));
    }

    // -----------------------------------------------------------------------
    // Requests to the host
    // -----------------------------------------------------------------------

    #[wasm_bindgen(js_name = requestSpawn)]
    pub fn request_spawn(
        &self,
        object_type: &str,
        px: f32,
        py: f32,
        pz: f32,
        prefab_id: Option<String>,
    ) -> Result<(), JsValue> {
        self.spaces
            .bridge()
            .borrow()
            .request_spawn(
                object_type,
                Vec3::new(px, py, pz),
                Quat::identity(),
                prefab_id.as_deref(),
            )
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = requestDespawn)]
    pub fn request_despawn(&self, object_id: &str) -> Result<(), JsValue> {
        self.spaces.bridge().borrow().request_despawn(object_id).map_err(to_js)
    }

    #[wasm_bindgen(js_name = requestOwnership)]
    pub fn request_ownership(&self, object_id: &str) -> Result<(), JsValue> {
        self.spaces.bridge().borrow().request_ownership(object_id).map_err(to_js)
    }

    /// `dataJson` must be valid JSON.
    #[wasm_bindgen(js_name = sendCustomEvent)]
    pub fn send_custom_event(&self, event_name: &str, data_json: &str) -> Result<(), JsValue> {
        let data: serde_json::Value = serde_json::from_str(data_json)
            .map_err(|e| JsValue::from_str(&format!("invalid data: {}", e)))?;
        self.spaces
            .bridge()
            .borrow()
            .send_custom_event(event_name, data)
            .map_err(to_js)
    }

    // -----------------------------------------------------------------------
    // Scene entities
    // -----------------------------------------------------------------------

    /// Register a scene entity (`kind`: `"mediaScreen"` | `"portal"` |
    /// `"seatingHotspot"` | `"videoCanvas"`). Returns `false` if it already
    /// exists.
    #[wasm_bindgen(js_name = addEntity)]
    pub fn add_entity(
        &mut self,
        kind: &str,
        id: &str,
        px: f32,
        py: f32,
        pz: f32,
    ) -> Result<bool, JsValue> {
        let kind = parse_kind(kind)?;
        self.spaces
            .add_entity(kind, id, Transform::from_position(Vec3::new(px, py, pz)))
            .map_err(to_js)
    }

    /// Toggle an entity when its scene object is shown or hidden. Returns
    /// `false` if the entity is unknown.
    #[wasm_bindgen(js_name = setEntityEnabled)]
    pub fn set_entity_enabled(
        &mut self,
        kind: &str,
        id: &str,
        enabled: bool,
    ) -> Result<bool, JsValue> {
        let kind = parse_kind(kind)?;
        self.spaces
            .set_entity_enabled(kind, id, enabled)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeEntity)]
    pub fn remove_entity(&mut self, kind: &str, id: &str) -> Result<bool, JsValue> {
        let kind = parse_kind(kind)?;
        Ok(self.spaces.remove_entity(kind, id))
    }

    /// Scan a `.gltf` / `.glb` buffer for hotspot nodes and register them.
    /// Returns how many were new.
    #[wasm_bindgen(js_name = adoptScene)]
    pub fn adopt_scene(&mut self, bytes: &[u8]) -> Result<u32, JsValue> {
        let found = hotspots::detect_in_slice(bytes, &hotspots::default_rules()).map_err(to_js)?;
        self.spaces
            .adopt_hotspots(&found)
            .map(|n| n as u32)
            .map_err(to_js)
    }

    /// Report a click. `source`: `"pointer"` | `"mouse"` | `"raycast"`.
    ///
    /// Returns `"click"`, `"play"` or `null` when ignored.
    #[wasm_bindgen]
    pub fn click(&mut self, kind: &str, id: &str, source: &str) -> Result<Option<String>, JsValue> {
        let kind = parse_kind(kind)?;
        let source = parse_source(source).ok_or_else(|| JsValue::from_str("unknown click source"))?;
        Ok(self.spaces.click(kind, id, source).map(|a| {
            match a {
                ClickAction::Click(_) => "click",
                ClickAction::Play(_) => "play",
            }
            .to_string()
        }))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `"Disconnected"` | `"Connecting"` | `"Connected"` | `"Reconnecting"`
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.spaces.bridge().borrow().state())
    }

    #[wasm_bindgen(js_name = isConnected)]
    pub fn is_connected(&self) -> bool {
        self.spaces.bridge().borrow().is_connected()
    }

    #[wasm_bindgen(js_name = localActorId)]
    pub fn local_actor_id(&self) -> Option<String> {
        self.spaces.bridge().borrow().local_actor_id().map(str::to_string)
    }

    #[wasm_bindgen(js_name = actorCount)]
    pub fn actor_count(&self) -> u32 {
        self.spaces.bridge().borrow().actor_count() as u32
    }

    #[wasm_bindgen(js_name = objectCount)]
    pub fn object_count(&self) -> u32 {
        self.spaces.bridge().borrow().object_count() as u32
    }

    /// Interpolated position of a remote actor as `[x, y, z]`, or `null`.
    #[wasm_bindgen(js_name = actorPosition)]
    pub fn actor_position(&self, actor_id: &str) -> Option<Vec<f32>> {
        self.spaces.bridge().borrow().actor(actor_id).map(|a| {
            let p = a.current_position;
            vec![p.x, p.y, p.z]
        })
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn to_js(e: spaces_bridge::BridgeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_kind(kind: &str) -> Result<EntityKind, JsValue> {
    kind.parse::<EntityKind>().map_err(|e| JsValue::from_str(&e))
}

fn parse_source(source: &str) -> Option<ClickSource> {
    match source.to_ascii_lowercase().as_str() {
        "pointer" | "pointerevent" => Some(ClickSource::PointerEvent),
        "mouse" | "mousedown" => Some(ClickSource::MouseDown),
        "raycast" => Some(ClickSource::Raycast),
        _ => None,
    }
}

fn outcome_name(outcome: DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Delivered => "delivered",
        DispatchOutcome::Unhandled => "unhandled",
        DispatchOutcome::Failed => "failed",
    }
}
