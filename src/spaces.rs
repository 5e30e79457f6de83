//! `Spaces`: the root context.
//!
//! Owns the event registry, the bridge, the emitter and one
//! [`RenderableSet`] per entity kind. Everything is wired in [`Spaces::new`]
//! and torn down in [`Spaces::shutdown`]; there are no globals.
//!
//! ```text
//!  host ──handle_event──▶ EventRegistry ──▶ SpacesBridge
//!                              │
//!                              └──────────▶ RenderableSet × 4
//!
//!  frame ──tick──▶ bridge.update() + set.poll()
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::bridge::SpacesBridge;
use crate::emitter::{Emitter, HostSink};
use crate::error::BridgeResult;
use crate::hotspots::DetectedHotspot;
use crate::loader::{TaskSpawner, TextureSource};
use crate::registry::{DispatchOutcome, EventRegistry};
use crate::render::RenderLayer;
use crate::renderable::{ClickAction, ClickSource, EntityKind, RenderContext, RenderableSet};
use crate::types::{BridgeConfig, IngressConfig, Transform};

/// Adapters a [`Spaces`] context is built from.
pub struct SpacesAdapters {
    pub sink: Rc<dyn HostSink>,
    pub render: Rc<RefCell<dyn RenderLayer>>,
    pub textures: Rc<dyn TextureSource>,
    pub spawner: Rc<dyn TaskSpawner>,
}

#[derive(Debug, Clone, Default)]
pub struct SpacesConfig {
    pub bridge: BridgeConfig,
    pub ingress: IngressConfig,
    /// Transport timeout applied to texture requests that carry none.
    pub load_timeout: Option<Duration>,
}

pub struct Spaces {
    registry: EventRegistry,
    bridge: Rc<RefCell<SpacesBridge>>,
    emitter: Emitter,
    sets: BTreeMap<EntityKind, Rc<RefCell<RenderableSet>>>,
    frame: u64,
    clock: f64,
    shut_down: bool,
}

impl Spaces {
    pub fn new(adapters: SpacesAdapters, config: SpacesConfig) -> Self {
        let emitter = Emitter::new(adapters.sink);
        let mut registry = EventRegistry::new(config.ingress);

        let bridge = Rc::new(RefCell::new(SpacesBridge::new(
            config.bridge,
            adapters.render.clone(),
            emitter.clone(),
        )));
        SpacesBridge::install(&bridge, &mut registry);

        let ctx = RenderContext {
            render: adapters.render,
            emitter: emitter.clone(),
            textures: adapters.textures,
            spawner: adapters.spawner,
            load_timeout: config.load_timeout,
        };

        let mut sets = BTreeMap::new();
        for kind in EntityKind::ALL {
            let set = Rc::new(RefCell::new(RenderableSet::new(kind, ctx.clone())));
            RenderableSet::install(&set, &mut registry);
            sets.insert(kind, set);
        }

        log::info!(
            "[spaces] Context ready ({} event handlers)",
            registry.handler_count()
        );

        Self {
            registry,
            bridge,
            emitter,
            sets,
            frame: 0,
            clock: 0.0,
            shut_down: false,
        }
    }

    // ------------------------------------------------------------------
    // Host → render layer
    // ------------------------------------------------------------------

    /// Single host entry point: an envelope (or bare payload) as JSON text.
    pub fn handle_event(&mut self, message: &str) -> DispatchOutcome {
        if self.shut_down {
            log::debug!("[spaces] Event after shutdown dropped");
            return DispatchOutcome::Unhandled;
        }
        self.registry.handle_event(message)
    }

    /// Direct dispatch of an already-split event.
    pub fn process_event(&mut self, event_name: &str, payload: &str) -> DispatchOutcome {
        if self.shut_down {
            return DispatchOutcome::Unhandled;
        }
        self.registry.process_event(event_name, payload)
    }

    /// Advance one frame: interpolate, send the local transform if due,
    /// then apply finished texture loads.
    pub fn tick(&mut self, dt: f32, local: Option<&Transform>) {
        if self.shut_down {
            return;
        }
        self.frame += 1;
        self.clock += dt as f64;
        self.bridge.borrow_mut().update(dt, self.clock, local);
        for set in self.sets.values() {
            set.borrow_mut().poll();
        }
    }

    // ------------------------------------------------------------------
    // Render layer → host
    // ------------------------------------------------------------------

    /// Forward a click detected in the current frame.
    pub fn click(
        &mut self,
        kind: EntityKind,
        id: &str,
        source: ClickSource,
    ) -> Option<ClickAction> {
        let frame = self.frame;
        self.set(kind).borrow_mut().click(id, source, frame)
    }

    /// Track a scene-authored entity and register it with the host.
    pub fn add_entity(
        &mut self,
        kind: EntityKind,
        id: &str,
        transform: Transform,
    ) -> BridgeResult<bool> {
        let mut set = self.set(kind).borrow_mut();
        if !set.add(id, transform) {
            return Ok(false);
        }
        set.enable(id)?;
        Ok(true)
    }

    /// Enabling re-announces the entity to the host; disabling aborts its
    /// pending load and ignores its clicks. `false` for an unknown id.
    pub fn set_entity_enabled(
        &mut self,
        kind: EntityKind,
        id: &str,
        enabled: bool,
    ) -> BridgeResult<bool> {
        let mut set = self.set(kind).borrow_mut();
        if set.get(id).is_none() {
            return Ok(false);
        }
        if enabled {
            set.enable(id)?;
        } else {
            set.disable(id);
        }
        Ok(true)
    }

    pub fn remove_entity(&mut self, kind: EntityKind, id: &str) -> bool {
        self.set(kind).borrow_mut().remove(id)
    }

    /// Adopt hotspots found in a loaded scene. Returns how many were new.
    pub fn adopt_hotspots(&mut self, hotspots: &[DetectedHotspot]) -> BridgeResult<usize> {
        let mut adopted = 0;
        for h in hotspots {
            if self.add_entity(h.kind, &h.id, h.transform)? {
                adopted += 1;
            }
        }
        log::info!("[spaces] Adopted {}/{} hotspots", adopted, hotspots.len());
        Ok(adopted)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn bridge(&self) -> &Rc<RefCell<SpacesBridge>> {
        &self.bridge
    }

    pub fn set(&self, kind: EntityKind) -> &Rc<RefCell<RenderableSet>> {
        // Every kind is inserted in `new`.
        &self.sets[&kind]
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Drop every handler, abort every load and clear all mirrored state.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.registry.clear();
        for set in self.sets.values() {
            set.borrow_mut().clear();
        }
        self.bridge.borrow_mut().reset();
        log::info!("[spaces] Shut down");
    }
}

impl Drop for Spaces {
    fn drop(&mut self) {
        self.shutdown();
    }
}
