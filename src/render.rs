//! Render-layer adapter.
//!
//! The bridge never touches scene objects directly; it talks to whatever
//! implements [`RenderLayer`]. Engines plug in their own implementation,
//! [`HeadlessRenderLayer`] keeps everything in memory for tests and replay.

use std::collections::HashMap;

use crate::loader::Texture;
use crate::renderable::EntityKind;
use crate::types::Transform;

/// Opaque handle to a visual created by the render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// How a visual should be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualKind {
    Prefab(String),
    /// Primitive used when no prefab is configured.
    Capsule,
}

impl VisualKind {
    pub fn from_prefab(prefab: Option<&str>) -> Self {
        match prefab {
            Some(p) if !p.is_empty() => VisualKind::Prefab(p.to_string()),
            _ => VisualKind::Capsule,
        }
    }
}

pub trait RenderLayer {
    /// Create a visual for a remote actor or networked object.
    fn spawn_visual(&mut self, key: &str, kind: VisualKind, transform: &Transform) -> VisualHandle;
    fn set_visual_transform(&mut self, handle: VisualHandle, transform: &Transform);
    fn destroy_visual(&mut self, handle: VisualHandle);

    fn set_animation(&mut self, _handle: VisualHandle, _animation: &str) {}
    fn set_speaking(&mut self, _handle: VisualHandle, _speaking: bool) {}

    /// Show `texture` on an addressable entity, or clear it with `None`.
    /// The layer owns whatever texture it was showing before.
    fn set_entity_texture(&mut self, kind: EntityKind, id: &str, texture: Option<&Texture>);
    fn set_entity_transform(&mut self, kind: EntityKind, id: &str, transform: &Transform);

    /// A loaded texture that will never be shown (stale or orphaned load).
    fn release_texture(&mut self, _texture: Texture) {}
}

// ---------------------------------------------------------------------------
// Headless implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HeadlessVisual {
    pub key: String,
    pub kind: VisualKind,
    pub transform: Transform,
    pub animation: Option<String>,
    pub speaking: bool,
}

/// In-memory render layer.
#[derive(Debug, Default)]
pub struct HeadlessRenderLayer {
    next_handle: u64,
    pub visuals: HashMap<VisualHandle, HeadlessVisual>,
    pub textures: HashMap<(EntityKind, String), Option<Texture>>,
    pub entity_transforms: HashMap<(EntityKind, String), Transform>,
    /// Number of times a texture was cleared, per entity.
    pub clears: HashMap<(EntityKind, String), usize>,
    /// Loaded textures handed back without being shown.
    pub released: Vec<Texture>,
}

impl HeadlessRenderLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn visual_for(&self, key: &str) -> Option<&HeadlessVisual> {
        self.visuals.values().find(|v| v.key == key)
    }

    pub fn texture_of(&self, kind: EntityKind, id: &str) -> Option<&Texture> {
        self.textures
            .get(&(kind, id.to_string()))
            .and_then(|t| t.as_ref())
    }

    pub fn clear_count(&self, kind: EntityKind, id: &str) -> usize {
        self.clears.get(&(kind, id.to_string())).copied().unwrap_or(0)
    }
}

impl RenderLayer for HeadlessRenderLayer {
    fn spawn_visual(&mut self, key: &str, kind: VisualKind, transform: &Transform) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.visuals.insert(
            handle,
            HeadlessVisual {
                key: key.to_string(),
                kind,
                transform: *transform,
                animation: None,
                speaking: false,
            },
        );
        handle
    }

    fn set_visual_transform(&mut self, handle: VisualHandle, transform: &Transform) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.transform = *transform;
        }
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.visuals.remove(&handle);
    }

    fn set_animation(&mut self, handle: VisualHandle, animation: &str) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.animation = Some(animation.to_string());
        }
    }

    fn set_speaking(&mut self, handle: VisualHandle, speaking: bool) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.speaking = speaking;
        }
    }

    fn set_entity_texture(&mut self, kind: EntityKind, id: &str, texture: Option<&Texture>) {
        let key = (kind, id.to_string());
        if texture.is_none() {
            *self.clears.entry(key.clone()).or_insert(0) += 1;
        }
        self.textures.insert(key, texture.cloned());
    }

    fn set_entity_transform(&mut self, kind: EntityKind, id: &str, transform: &Transform) {
        self.entity_transforms
            .insert((kind, id.to_string()), *transform);
    }

    fn release_texture(&mut self, texture: Texture) {
        self.released.push(texture);
    }
}
