//! `RenderLayer` backed by JavaScript callbacks.
//!
//! The page owns the actual scene (three.js, Babylon, a Unity build, …).
//! Every render-layer operation is forwarded to a callback the page
//! registered on [`SpacesClient`](crate::client::SpacesClient).
//!
//! Transforms are flattened to ten numbers:
//! `px, py, pz, rx, ry, rz, rw, sx, sy, sz`.
//!
//! Textures arrive as `blob:` object URLs. The layer keeps the one shown on
//! each entity and revokes it once it is replaced, cleared or never shown.

use std::collections::HashMap;

use spaces_bridge::{
    loader::Texture, render::RenderLayer, EntityKind, Transform, VisualHandle, VisualKind,
};
use wasm_bindgen::JsValue;

#[derive(Default)]
pub struct JsCallbacks {
    pub spawn_visual: Option<js_sys::Function>,
    pub visual_transform: Option<js_sys::Function>,
    pub destroy_visual: Option<js_sys::Function>,
    pub animation: Option<js_sys::Function>,
    pub speaking: Option<js_sys::Function>,
    pub entity_texture: Option<js_sys::Function>,
    pub entity_transform: Option<js_sys::Function>,
}

#[derive(Default)]
pub struct JsRenderLayer {
    next_handle: u64,
    pub callbacks: JsCallbacks,
    object_urls: HashMap<(EntityKind, String), String>,
}

impl JsRenderLayer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Only `blob:` URLs are ours to revoke.
pub fn is_object_url(resource: &str) -> bool {
    resource.starts_with("blob:")
}

fn revoke(resource: &str) {
    if !is_object_url(resource) {
        return;
    }
    if let Err(e) = web_sys::Url::revoke_object_url(resource) {
        log::warn!("[client] revokeObjectURL failed: {:?}", e);
    }
}

/// Flatten a transform into callback arguments.
pub fn transform_args(t: &Transform) -> [f64; 10] {
    [
        t.position.x as f64,
        t.position.y as f64,
        t.position.z as f64,
        t.rotation.x as f64,
        t.rotation.y as f64,
        t.rotation.z as f64,
        t.rotation.w as f64,
        t.scale.x as f64,
        t.scale.y as f64,
        t.scale.z as f64,
    ]
}

/// Prefab name, or `None` for the primitive fallback.
pub fn prefab_name(kind: &VisualKind) -> Option<&str> {
    match kind {
        VisualKind::Prefab(p) => Some(p.as_str()),
        VisualKind::Capsule => None,
    }
}

fn with_transform(mut head: Vec<JsValue>, t: &Transform) -> Vec<JsValue> {
    head.extend(transform_args(t).iter().map(|v| JsValue::from(*v)));
    head
}

fn handle_value(handle: VisualHandle) -> JsValue {
    JsValue::from(handle.0 as f64)
}

impl RenderLayer for JsRenderLayer {
    fn spawn_visual(&mut self, key: &str, kind: VisualKind, transform: &Transform) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        let prefab = prefab_name(&kind).map(JsValue::from_str).unwrap_or(JsValue::NULL);
        call_fn(
            &self.callbacks.spawn_visual,
            &with_transform(vec![handle_value(handle), JsValue::from_str(key), prefab], transform),
        );
        handle
    }

    fn set_visual_transform(&mut self, handle: VisualHandle, transform: &Transform) {
        call_fn(
            &self.callbacks.visual_transform,
            &with_transform(vec![handle_value(handle)], transform),
        );
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        call_fn(&self.callbacks.destroy_visual, &[handle_value(handle)]);
    }

    fn set_animation(&mut self, handle: VisualHandle, animation: &str) {
        call_fn(
            &self.callbacks.animation,
            &[handle_value(handle), JsValue::from_str(animation)],
        );
    }

    fn set_speaking(&mut self, handle: VisualHandle, speaking: bool) {
        call_fn(
            &self.callbacks.speaking,
            &[handle_value(handle), JsValue::from_bool(speaking)],
        );
    }

    fn set_entity_texture(&mut self, kind: EntityKind, id: &str, texture: Option<&Texture>) {
        let key = (kind, id.to_string());
        let previous = match texture {
            Some(t) => self.object_urls.insert(key, t.resource.clone()),
            None => self.object_urls.remove(&key),
        };

        let resource = texture
            .map(|t| JsValue::from_str(&t.resource))
            .unwrap_or(JsValue::NULL);
        call_fn(
            &self.callbacks.entity_texture,
            &[JsValue::from_str(kind.name()), JsValue::from_str(id), resource],
        );

        // The page has switched over; the old blob can go.
        if let Some(prev) = previous {
            if texture.map(|t| t.resource.as_str()) != Some(prev.as_str()) {
                revoke(&prev);
            }
        }
    }

    fn release_texture(&mut self, texture: Texture) {
        revoke(&texture.resource);
    }

    fn set_entity_transform(&mut self, kind: EntityKind, id: &str, transform: &Transform) {
        call_fn(
            &self.callbacks.entity_transform,
            &with_transform(
                vec![JsValue::from_str(kind.name()), JsValue::from_str(id)],
                transform,
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// JS callback helper
// ---------------------------------------------------------------------------

pub(crate) fn call_fn(f: &Option<js_sys::Function>, args: &[JsValue]) {
    if let Some(func) = f {
        let this = JsValue::NULL;
        let arr = js_sys::Array::new();
        for a in args {
            arr.push(a);
        }
        if let Err(e) = func.apply(&this, &arr) {
            log::warn!("[client] Callback error: {:?}", e);
        }
    }
}
