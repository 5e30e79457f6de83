//! Spaces Bridge
//!
//! Keeps a render layer in sync with the state of a multiplayer space owned
//! by a browser host. The host pushes JSON events in; the bridge mirrors
//! actors, objects and addressable scene entities, and answers through a
//! small set of named host entry points.
//!
//! ## Architecture
//!
//! ```text
//! Spaces  (spaces.rs)                      ← context, new / tick / shutdown
//!   ├── EventRegistry  (registry.rs)       ← envelope ingress + dispatch
//!   ├── SpacesBridge   (bridge.rs)         ← connection, actors, objects
//!   ├── RenderableSet ×4 (renderable.rs)   ← screens, portals, seats, canvases
//!   └── Emitter        (emitter.rs)        ← typed payload → HostSink
//!
//! Adapters: RenderLayer (render.rs), TextureSource + TaskSpawner (loader.rs),
//!           HostSink (emitter.rs)
//! ```
//!
//! The `headless` feature adds the settings loader, the replay harness and
//! the `spaces-bridge-replay` binary.

// Protocol and core types are always available.
pub mod error;
pub mod protocol;
pub mod types;

pub mod bridge;
pub mod emitter;
pub mod hotspots;
pub mod loader;
pub mod registry;
pub mod render;
pub mod renderable;
pub mod spaces;

// Headless tooling requires the `headless` feature.
#[cfg(feature = "headless")]
pub mod replay;
#[cfg(feature = "headless")]
pub mod settings;

pub use bridge::{BridgeState, NetworkedObject, RemoteActor, SpacesBridge};
pub use emitter::{Emitter, HostSink, LogSink, MemorySink, SentMessage};
pub use error::{BridgeError, BridgeResult};
pub use registry::{DispatchOutcome, EventRegistry};
pub use render::{HeadlessRenderLayer, RenderLayer, VisualHandle, VisualKind};
pub use renderable::{ClickAction, ClickSource, EntityKind, RenderableSet, RemoteRenderable};
pub use spaces::{Spaces, SpacesAdapters, SpacesConfig};
pub use types::{BridgeConfig, IngressConfig, Quat, Transform, Vec3};
