//! Addressable render-layer entities: media screens, portals, seating
//! hotspots and video canvases.
//!
//! All four kinds share one implementation. What differs per kind (event
//! names, identity key, host entry points) lives in a [`KindProfile`], and
//! the image / thumbnail / play decision lives in [`click_action`].
//!
//! ## Loads
//!
//! ```text
//! apply_content ──▶ start_load ──▶ TextureSource::fetch  (abortable)
//!                       │                │
//!                       │ aborts prior   ▼ spawned on TaskSpawner
//!                       │          completions queue
//!                       ▼                │
//!                  in_flight ◀── poll() ─┘  (generation must match)
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, AbortHandle, Aborted};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::emitter::Emitter;
use crate::error::{BridgeError, BridgeResult};
use crate::loader::{TaskSpawner, Texture, TextureRequest, TextureSource};
use crate::protocol::{
    self, entry_points, events, EntityClicked, EntityRegistration, MediaSummary, PlayVideo,
    TransformUpdate,
};
use crate::registry::EventRegistry;
use crate::render::RenderLayer;
use crate::types::Transform;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    MediaScreen,
    Portal,
    SeatingHotspot,
    VideoCanvas,
}

/// Everything that varies between entity kinds.
#[derive(Debug)]
pub struct KindProfile {
    pub kind: EntityKind,
    /// Name used in outbound payloads.
    pub name: &'static str,
    /// JSON key carrying the identity in inbound payloads.
    pub identity_field: &'static str,
    pub register_entry: &'static str,
    pub click_entry: &'static str,
    pub play_entry: Option<&'static str>,
    pub transform_event: &'static str,
    /// Whether the kind ever shows a texture.
    pub has_media: bool,
}

const MEDIA_SCREEN: KindProfile = KindProfile {
    kind: EntityKind::MediaScreen,
    name: "mediaScreen",
    identity_field: "screenId",
    register_entry: entry_points::REGISTER_MEDIA_SCREEN,
    click_entry: entry_points::MEDIA_SCREEN_CLICKED,
    play_entry: Some(entry_points::PLAY_MEDIA_SCREEN_VIDEO),
    transform_event: events::UPDATE_MEDIA_SCREEN_TRANSFORM,
    has_media: true,
};

const PORTAL: KindProfile = KindProfile {
    kind: EntityKind::Portal,
    name: "portal",
    identity_field: "portalId",
    register_entry: entry_points::REGISTER_PORTAL,
    click_entry: entry_points::PORTAL_CLICKED,
    play_entry: None,
    transform_event: events::UPDATE_PORTAL_TRANSFORM,
    has_media: true,
};

const SEATING_HOTSPOT: KindProfile = KindProfile {
    kind: EntityKind::SeatingHotspot,
    name: "seatingHotspot",
    identity_field: "hotspotId",
    register_entry: entry_points::REGISTER_SEATING_HOTSPOT,
    click_entry: entry_points::SEATING_HOTSPOT_CLICKED,
    play_entry: None,
    transform_event: events::UPDATE_SEATING_HOTSPOT_TRANSFORM,
    has_media: false,
};

const VIDEO_CANVAS: KindProfile = KindProfile {
    kind: EntityKind::VideoCanvas,
    name: "videoCanvas",
    identity_field: "canvasId",
    register_entry: entry_points::REGISTER_VIDEO_CANVAS,
    click_entry: entry_points::VIDEO_CANVAS_CLICKED,
    play_entry: Some(entry_points::PLAY_VIDEO_CANVAS),
    // Canvases are moved by re-sending PlaceVideoCanvas.
    transform_event: events::PLACE_VIDEO_CANVAS,
    has_media: true,
};

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::MediaScreen,
        EntityKind::Portal,
        EntityKind::SeatingHotspot,
        EntityKind::VideoCanvas,
    ];

    pub fn profile(self) -> &'static KindProfile {
        match self {
            EntityKind::MediaScreen => &MEDIA_SCREEN,
            EntityKind::Portal => &PORTAL,
            EntityKind::SeatingHotspot => &SEATING_HOTSPOT,
            EntityKind::VideoCanvas => &VIDEO_CANVAS,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown entity kind '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Kind-independent form of every "set content" message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentUpdate {
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub media_type: Option<String>,
    pub display_as_video: Option<bool>,
    pub play_on_click: Option<bool>,
    pub refresh_timestamp: Option<i64>,
}

impl From<protocol::SetMediaScreenImage> for ContentUpdate {
    fn from(m: protocol::SetMediaScreenImage) -> Self {
        Self {
            image_url: m.image_url,
            thumbnail_url: m.thumbnail_url,
            video_url: m.video_url,
            media_type: m.media_type,
            display_as_video: Some(m.display_as_video),
            play_on_click: m.play_on_click,
            refresh_timestamp: m.refresh_timestamp,
        }
    }
}

impl From<protocol::SetMediaScreenThumbnail> for ContentUpdate {
    fn from(m: protocol::SetMediaScreenThumbnail) -> Self {
        Self {
            thumbnail_url: Some(m.thumbnail_url),
            refresh_timestamp: m.refresh_timestamp,
            ..Default::default()
        }
    }
}

impl From<protocol::SetPortalImage> for ContentUpdate {
    fn from(m: protocol::SetPortalImage) -> Self {
        Self {
            image_url: Some(m.image_url),
            media_type: Some("image".into()),
            refresh_timestamp: m.refresh_timestamp,
            ..Default::default()
        }
    }
}

impl From<&protocol::PlaceVideoCanvas> for ContentUpdate {
    fn from(m: &protocol::PlaceVideoCanvas) -> Self {
        Self {
            thumbnail_url: m.thumbnail_url.clone(),
            video_url: m.video_url.clone(),
            media_type: Some("video".into()),
            display_as_video: Some(true),
            play_on_click: m.play_on_click,
            refresh_timestamp: m.refresh_timestamp,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaState {
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub media_type: Option<String>,
    pub display_as_video: bool,
    pub play_on_click: Option<bool>,
}

impl MediaState {
    fn merge(&mut self, u: &ContentUpdate) {
        if let Some(v) = &u.image_url {
            self.image_url = Some(v.clone());
        }
        if let Some(v) = &u.thumbnail_url {
            self.thumbnail_url = Some(v.clone());
        }
        if let Some(v) = &u.video_url {
            self.video_url = Some(v.clone());
        }
        if let Some(v) = &u.media_type {
            self.media_type = Some(v.clone());
        }
        if let Some(v) = u.display_as_video {
            self.display_as_video = v;
        }
        if let Some(v) = u.play_on_click {
            self.play_on_click = Some(v);
        }
    }

    pub fn is_video(&self) -> bool {
        self.media_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("video"))
            .unwrap_or(false)
    }

    /// Video shown as a still: the thumbnail is displayed, a click plays.
    pub fn is_video_mode(&self) -> bool {
        self.is_video() && self.display_as_video
    }

    /// URL of the image that should be on screen.
    pub fn display_url(&self) -> Option<&str> {
        let (first, second) = if self.is_video_mode() {
            (&self.thumbnail_url, &self.image_url)
        } else {
            (&self.image_url, &self.thumbnail_url)
        };
        first
            .as_deref()
            .or(second.as_deref())
            .filter(|u| !u.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Which detection path reported a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickSource {
    PointerEvent,
    MouseDown,
    Raycast,
}

/// What a click turns into on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    Click(EntityClicked),
    Play(PlayVideo),
}

struct InFlightLoad {
    generation: u64,
    url: String,
    abort: AbortHandle,
}

struct LoadCompletion {
    id: String,
    generation: u64,
    result: BridgeResult<Texture>,
}

pub struct RemoteRenderable {
    kind: EntityKind,
    id: String,
    transform: Transform,
    media: MediaState,
    texture: Option<Texture>,
    has_content: bool,
    last_refresh: Option<i64>,
    in_flight: Option<InFlightLoad>,
    enabled: bool,
    last_click_frame: Option<u64>,
}

impl RemoteRenderable {
    fn new(kind: EntityKind, id: String, transform: Transform) -> Self {
        Self {
            kind,
            id,
            transform,
            media: MediaState::default(),
            texture: None,
            has_content: false,
            last_refresh: None,
            in_flight: None,
            enabled: false,
            last_click_frame: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn media(&self) -> &MediaState {
        &self.media
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn loading_url(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.url.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_refresh(&self) -> Option<i64> {
        self.last_refresh
    }

    pub fn summary(&self) -> MediaSummary {
        MediaSummary {
            image_url: self.media.image_url.clone(),
            thumbnail_url: self.media.thumbnail_url.clone(),
            video_url: self.media.video_url.clone(),
            media_type: self.media.media_type.clone(),
            has_content: self.has_content,
        }
    }

    fn cancel_load(&mut self) {
        if let Some(prev) = self.in_flight.take() {
            prev.abort.abort();
            log::debug!(
                "[renderable] {} '{}': cancelled load of {}",
                self.kind.name(),
                self.id,
                prev.url
            );
        }
    }
}

/// Decide what a click on `entity` means. Shared by every kind.
pub fn click_action(entity: &RemoteRenderable) -> ClickAction {
    let profile = entity.kind.profile();
    let media = &entity.media;

    if let (Some(_), Some(video_url)) = (profile.play_entry, media.video_url.as_deref()) {
        let wants_play = media.play_on_click.unwrap_or(true);
        if media.is_video_mode() && wants_play && !video_url.is_empty() {
            return ClickAction::Play(PlayVideo {
                kind: profile.name.to_string(),
                id: entity.id.clone(),
                video_url: video_url.to_string(),
            });
        }
    }

    ClickAction::Click(EntityClicked {
        kind: profile.name.to_string(),
        id: entity.id.clone(),
        media_type: media.media_type.clone(),
        image_url: media.display_url().map(str::to_string),
    })
}

// ---------------------------------------------------------------------------
// Shared dependencies
// ---------------------------------------------------------------------------

/// Collaborators every renderable set needs.
#[derive(Clone)]
pub struct RenderContext {
    pub render: Rc<RefCell<dyn RenderLayer>>,
    pub emitter: Emitter,
    pub textures: Rc<dyn TextureSource>,
    pub spawner: Rc<dyn TaskSpawner>,
    pub load_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Set
// ---------------------------------------------------------------------------

/// All entities of one kind, keyed by identity.
pub struct RenderableSet {
    kind: EntityKind,
    entities: BTreeMap<String, RemoteRenderable>,
    ctx: RenderContext,
    completions: Rc<RefCell<VecDeque<LoadCompletion>>>,
    next_generation: u64,
}

impl RenderableSet {
    pub fn new(kind: EntityKind, ctx: RenderContext) -> Self {
        Self {
            kind,
            entities: BTreeMap::new(),
            ctx,
            completions: Rc::new(RefCell::new(VecDeque::new())),
            next_generation: 0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn get(&self, id: &str) -> Option<&RemoteRenderable> {
        self.entities.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Track a new entity. Returns `false` if `id` is already tracked.
    pub fn add(&mut self, id: &str, transform: Transform) -> bool {
        if self.entities.contains_key(id) {
            log::warn!("[renderable] Duplicate {} '{}' ignored", self.kind.name(), id);
            return false;
        }
        self.entities.insert(
            id.to_string(),
            RemoteRenderable::new(self.kind, id.to_string(), transform),
        );
        self.ctx
            .render
            .borrow_mut()
            .set_entity_transform(self.kind, id, &transform);
        true
    }

    /// Activate an entity and announce it to the host.
    pub fn enable(&mut self, id: &str) -> BridgeResult<()> {
        let profile = self.kind.profile();
        let Some(entity) = self.entities.get_mut(id) else {
            return Ok(());
        };
        entity.enabled = true;
        if entity.id.is_empty() {
            log::debug!("[renderable] {} without identity: not registered", profile.name);
            return Ok(());
        }
        self.ctx.emitter.register_entity(
            profile.register_entry,
            &EntityRegistration {
                kind: profile.name.to_string(),
                id: entity.id.clone(),
                position: entity.transform.position,
                rotation: entity.transform.rotation,
                scale: entity.transform.scale,
                media: entity.summary(),
            },
        )
    }

    /// Deactivate: pending loads are aborted, clicks ignored.
    pub fn disable(&mut self, id: &str) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.enabled = false;
            entity.cancel_load();
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let Some(mut entity) = self.entities.remove(id) else {
            return false;
        };
        entity.cancel_load();
        if entity.texture.is_some() {
            self.ctx
                .render
                .borrow_mut()
                .set_entity_texture(self.kind, id, None);
        }
        true
    }

    /// Remove every entity (shutdown).
    pub fn clear(&mut self) {
        let ids: Vec<String> = self.entities.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
        let pending: Vec<LoadCompletion> = self.completions.borrow_mut().drain(..).collect();
        for c in pending {
            self.release(c.result);
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn apply_content(&mut self, id: &str, update: ContentUpdate) {
        let kind = self.kind;
        let Some(entity) = self.entities.get_mut(id) else {
            log::debug!("[renderable] Content for unknown {} '{}' ignored", kind.name(), id);
            return;
        };
        if !kind.profile().has_media {
            log::debug!("[renderable] {} '{}' has no media surface", kind.name(), id);
            return;
        }

        entity.media.merge(&update);

        let refresh = match (update.refresh_timestamp, entity.last_refresh) {
            (Some(ts), Some(last)) if ts > last => Some(ts),
            (Some(ts), None) => Some(ts),
            _ => None,
        };
        if refresh.is_some() {
            entity.last_refresh = refresh;
        }

        let Some(url) = entity.media.display_url().map(str::to_string) else {
            log::debug!("[renderable] {} '{}' has nothing to display", kind.name(), id);
            return;
        };

        let request = match refresh {
            Some(ts) => {
                entity.texture = None;
                entity.has_content = false;
                self.ctx.render.borrow_mut().set_entity_texture(kind, id, None);
                TextureRequest::cache_busted(&url, ts)
            }
            None => TextureRequest::plain(url),
        };
        self.start_load(id, request);
    }

    /// Drop the displayed texture and forget the media URLs.
    pub fn clear_content(&mut self, id: &str) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        entity.cancel_load();
        entity.media = MediaState::default();
        entity.texture = None;
        entity.has_content = false;
        self.ctx
            .render
            .borrow_mut()
            .set_entity_texture(self.kind, id, None);
    }

    pub fn apply_transform(&mut self, id: &str, update: &TransformUpdate) {
        let Some(entity) = self.entities.get_mut(id) else {
            log::warn!("[renderable] Transform for unknown {} '{}' ignored", self.kind.name(), id);
            return;
        };
        if let Some(p) = update.position {
            entity.transform.position = p;
        }
        if let Some(r) = update.rotation {
            entity.transform.rotation = r.normalized();
        }
        if let Some(s) = update.scale {
            entity.transform.scale = s;
        }
        self.ctx
            .render
            .borrow_mut()
            .set_entity_transform(self.kind, id, &entity.transform);
    }

    fn start_load(&mut self, id: &str, mut request: TextureRequest) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };

        entity.cancel_load();

        if request.timeout.is_none() {
            request.timeout = self.ctx.load_timeout;
        }
        let url = request.url.clone();
        log::debug!("[renderable] {} '{}': loading {}", self.kind.name(), id, url);

        let (fetch, abort) = future::abortable(self.ctx.textures.fetch(request));
        let queue = self.completions.clone();
        let owner = id.to_string();
        self.ctx.spawner.spawn(
            async move {
                match fetch.await {
                    Ok(result) => queue.borrow_mut().push_back(LoadCompletion {
                        id: owner,
                        generation,
                        result,
                    }),
                    Err(Aborted) => log::trace!("[renderable] load {} aborted", generation),
                }
            }
            .boxed_local(),
        );

        entity.in_flight = Some(InFlightLoad {
            generation,
            url,
            abort,
        });
    }

    /// Apply finished loads. Returns how many textures were applied.
    pub fn poll(&mut self) -> usize {
        let done: Vec<LoadCompletion> = self.completions.borrow_mut().drain(..).collect();
        let mut applied = 0;

        for c in done {
            let Some(entity) = self.entities.get_mut(&c.id) else {
                log::debug!("[renderable] Load {} for removed '{}' discarded", c.generation, c.id);
                self.release(c.result);
                continue;
            };
            let current = matches!(&entity.in_flight, Some(f) if f.generation == c.generation);
            if !current {
                log::debug!("[renderable] Stale load {} for '{}' discarded", c.generation, c.id);
                self.release(c.result);
                continue;
            }
            entity.in_flight = None;

            match c.result {
                Ok(texture) => {
                    self.ctx
                        .render
                        .borrow_mut()
                        .set_entity_texture(self.kind, &c.id, Some(&texture));
                    entity.texture = Some(texture);
                    entity.has_content = true;
                    applied += 1;
                }
                Err(e) => {
                    log::warn!("[renderable] {} '{}': {}", self.kind.name(), c.id, e);
                }
            }
        }
        applied
    }

    fn release(&self, result: BridgeResult<Texture>) {
        if let Ok(texture) = result {
            self.ctx.render.borrow_mut().release_texture(texture);
        }
    }

    // ------------------------------------------------------------------
    // Clicks
    // ------------------------------------------------------------------

    /// Report a click detected by `source` during `frame`.
    ///
    /// Several detection paths may fire for the same physical click; only
    /// the first one per frame is forwarded.
    pub fn click(&mut self, id: &str, source: ClickSource, frame: u64) -> Option<ClickAction> {
        let profile = self.kind.profile();
        let entity = self.entities.get_mut(id)?;
        if !entity.enabled {
            log::debug!("[renderable] Click on disabled {} '{}' ignored", profile.name, id);
            return None;
        }
        if entity.last_click_frame == Some(frame) {
            log::trace!("[renderable] Duplicate click via {:?} on '{}' ignored", source, id);
            return None;
        }
        entity.last_click_frame = Some(frame);

        let action = click_action(entity);
        let sent = match &action {
            ClickAction::Click(msg) => self.ctx.emitter.entity_clicked(profile.click_entry, msg),
            ClickAction::Play(msg) => self
                .ctx
                .emitter
                .play_video(profile.play_entry.unwrap_or(profile.click_entry), msg),
        };
        if let Err(e) = sent {
            log::warn!("[renderable] Failed to forward click on '{}': {}", id, e);
        }
        Some(action)
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    /// Register this kind's inbound events on `registry`.
    pub fn install(set: &Rc<RefCell<RenderableSet>>, registry: &mut EventRegistry) {
        let kind = set.borrow().kind;
        let profile = kind.profile();

        match kind {
            EntityKind::MediaScreen => {
                let s = set.clone();
                registry.register_typed(
                    events::SET_MEDIA_SCREEN_IMAGE,
                    move |m: protocol::SetMediaScreenImage| {
                        let id = m.screen_id.clone();
                        s.borrow_mut().apply_content(&id, m.into());
                        Ok(())
                    },
                );
                let s = set.clone();
                registry.register_typed(
                    events::SET_MEDIA_SCREEN_THUMBNAIL,
                    move |m: protocol::SetMediaScreenThumbnail| {
                        let id = m.screen_id.clone();
                        s.borrow_mut().apply_content(&id, m.into());
                        Ok(())
                    },
                );
                let s = set.clone();
                registry.register_typed(
                    events::CLEAR_MEDIA_SCREEN,
                    move |m: protocol::ClearMediaScreen| {
                        s.borrow_mut().clear_content(&m.screen_id);
                        Ok(())
                    },
                );
            }
            EntityKind::Portal => {
                let s = set.clone();
                registry.register_typed(
                    events::SET_PORTAL_IMAGE,
                    move |m: protocol::SetPortalImage| {
                        let id = m.portal_id.clone();
                        s.borrow_mut().apply_content(&id, m.into());
                        Ok(())
                    },
                );
            }
            EntityKind::SeatingHotspot => {}
            EntityKind::VideoCanvas => {
                let s = set.clone();
                registry.register_typed(
                    events::PLACE_VIDEO_CANVAS,
                    move |m: protocol::PlaceVideoCanvas| {
                        s.borrow_mut().place_video_canvas(m);
                        Ok(())
                    },
                );
                let s = set.clone();
                registry.register_typed(
                    events::REMOVE_VIDEO_CANVAS,
                    move |m: protocol::RemoveVideoCanvas| {
                        s.borrow_mut().remove(&m.canvas_id);
                        Ok(())
                    },
                );
                // PlaceVideoCanvas doubles as the transform event.
                return;
            }
        }

        let s = set.clone();
        let field = profile.identity_field;
        let event = profile.transform_event;
        registry.register_handler(event, move |payload| {
            let (id, update) = parse_identified(event, field, payload)?;
            s.borrow_mut().apply_transform(&id, &update);
            Ok(())
        });
    }

    /// Inbound event names handled by [`RenderableSet::install`] for `kind`.
    pub fn event_names(kind: EntityKind) -> &'static [&'static str] {
        match kind {
            EntityKind::MediaScreen => &[
                events::SET_MEDIA_SCREEN_IMAGE,
                events::SET_MEDIA_SCREEN_THUMBNAIL,
                events::CLEAR_MEDIA_SCREEN,
                events::UPDATE_MEDIA_SCREEN_TRANSFORM,
            ],
            EntityKind::Portal => &[events::SET_PORTAL_IMAGE, events::UPDATE_PORTAL_TRANSFORM],
            EntityKind::SeatingHotspot => &[events::UPDATE_SEATING_HOTSPOT_TRANSFORM],
            EntityKind::VideoCanvas => &[events::PLACE_VIDEO_CANVAS, events::REMOVE_VIDEO_CANVAS],
        }
    }

    /// Create or move a host-placed video canvas and load its content.
    fn place_video_canvas(&mut self, m: protocol::PlaceVideoCanvas) {
        let id = m.canvas_id.clone();
        if !self.entities.contains_key(&id) {
            let transform = Transform::new(
                m.position.unwrap_or_default(),
                m.rotation.unwrap_or_default(),
                m.scale.unwrap_or_else(crate::types::Vec3::one),
            );
            self.add(&id, transform);
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.enabled = true;
            }
        } else {
            self.apply_transform(
                &id,
                &TransformUpdate {
                    position: m.position,
                    rotation: m.rotation,
                    scale: m.scale,
                },
            );
        }
        self.apply_content(&id, ContentUpdate::from(&m));
    }
}

/// Split a kind-specific transform payload into `(identity, update)`.
fn parse_identified(
    event: &str,
    field: &str,
    payload: &str,
) -> BridgeResult<(String, TransformUpdate)> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|source| BridgeError::Payload {
            event: event.to_string(),
            source,
        })?;
    let id = value
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let update: TransformUpdate =
        serde_json::from_value(value).map_err(|source| BridgeError::Payload {
            event: event.to_string(),
            source,
        })?;
    Ok((id, update))
}
