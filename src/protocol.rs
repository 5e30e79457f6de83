//! Host ↔ render-layer wire protocol.
//!
//! This module owns **every message that crosses the interop boundary**
//! between the host application (browser/React) and the render layer.
//!
//! ## Directions
//!
//! | Direction        | Carried by                               |
//! |------------------|------------------------------------------|
//! | host → render    | `{eventName, data}` envelope → registry  |
//! | render → host    | named host entry point + JSON argument   |
//!
//! ## Design rules
//!
//! 1. Every struct is `Serialize + Deserialize` with camelCase JSON.
//! 2. Update messages use `Option` fields: absent or `null` means
//!    "leave unchanged".
//! 3. Missing transforms on create messages default to zero / identity.

use serde::{Deserialize, Serialize};

use crate::types::{Quat, Vec3};

// ---------------------------------------------------------------------------
// Ingress envelope
// ---------------------------------------------------------------------------

/// The combined envelope delivered by the host.
///
/// `data` is kept as a raw value: hosts send it as an object, as a JSON
/// string, or as a doubly-encoded JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEnvelope {
    pub event_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Connection lifecycle  (host → render)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConnecting {
    #[serde(default)]
    pub space_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConnect {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub instance_id: String,
    pub local_actor_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReconnecting {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDisconnect {
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Actors  (host → render)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorJoined {
    pub actor_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorLeft {
    pub actor_id: String,
}

/// Partial actor update. Each field is applied independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorUpdate {
    pub actor_id: String,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub animation: Option<String>,
    #[serde(default)]
    pub is_speaking: Option<bool>,
}

// ---------------------------------------------------------------------------
// Networked objects  (host → render)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpawned {
    pub object_id: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub prefab_id: Option<String>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub scale: Option<Vec3>,
    /// Opaque host-defined state.
    #[serde(default)]
    pub state: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDespawned {
    pub object_id: String,
}

/// Partial object update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpdate {
    pub object_id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub scale: Option<Vec3>,
    #[serde(default)]
    pub state: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Feature receivers  (host → render)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMediaScreenImage {
    pub screen_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// `"image"` or `"video"`.
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub display_as_video: bool,
    #[serde(default)]
    pub play_on_click: Option<bool>,
    #[serde(default)]
    pub refresh_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMediaScreenThumbnail {
    pub screen_id: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub refresh_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearMediaScreen {
    pub screen_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPortalImage {
    pub portal_id: String,
    pub image_url: String,
    #[serde(default)]
    pub refresh_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceVideoCanvas {
    pub canvas_id: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub play_on_click: Option<bool>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub scale: Option<Vec3>,
    #[serde(default)]
    pub refresh_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVideoCanvas {
    pub canvas_id: String,
}

/// Transform update shared by every renderable kind.
///
/// The identity key differs per kind (`screenId`, `portalId`, …), so it is
/// extracted separately by the receiver; only the transform fields live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformUpdate {
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub scale: Option<Vec3>,
}

// ---------------------------------------------------------------------------
// Outbound  (render → host)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalTransform {
    pub actor_id: String,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub object_type: String,
    pub position: Vec3,
    pub rotation: Quat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefab_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DespawnRequest {
    pub object_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRequest {
    pub object_id: String,
    pub requester_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    pub event_name: String,
    pub data: serde_json::Value,
}

/// Plain click on an addressable entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityClicked {
    pub kind: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Click on a video-mode entity that should start playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayVideo {
    pub kind: String,
    pub id: String,
    pub video_url: String,
}

/// Summary of what an entity currently shows, sent with registrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub has_content: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRegistration {
    pub kind: String,
    pub id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub media: MediaSummary,
}

// ---------------------------------------------------------------------------
// Event names and host entry points
// ---------------------------------------------------------------------------

/// Inbound event names (host → render), as constants.
pub mod events {
    pub const BRIDGE_CONNECTING: &str = "BridgeConnecting";
    pub const BRIDGE_CONNECT: &str = "BridgeConnect";
    pub const BRIDGE_RECONNECTING: &str = "BridgeReconnecting";
    pub const BRIDGE_DISCONNECT: &str = "BridgeDisconnect";

    pub const ACTOR_JOINED: &str = "ActorJoined";
    pub const ACTOR_LEFT: &str = "ActorLeft";
    pub const ACTOR_UPDATE: &str = "ActorUpdate";

    pub const OBJECT_SPAWNED: &str = "ObjectSpawned";
    pub const OBJECT_DESPAWNED: &str = "ObjectDespawned";
    pub const OBJECT_UPDATE: &str = "ObjectUpdate";

    pub const SET_MEDIA_SCREEN_IMAGE: &str = "SetMediaScreenImage";
    pub const SET_MEDIA_SCREEN_THUMBNAIL: &str = "SetMediaScreenThumbnail";
    pub const CLEAR_MEDIA_SCREEN: &str = "ClearMediaScreen";
    pub const UPDATE_MEDIA_SCREEN_TRANSFORM: &str = "UpdateMediaScreenTransform";

    pub const SET_PORTAL_IMAGE: &str = "SetPortalImage";
    pub const UPDATE_PORTAL_TRANSFORM: &str = "UpdatePortalTransform";

    pub const UPDATE_SEATING_HOTSPOT_TRANSFORM: &str = "UpdateSeatingHotspotTransform";

    pub const PLACE_VIDEO_CANVAS: &str = "PlaceVideoCanvas";
    pub const REMOVE_VIDEO_CANVAS: &str = "RemoveVideoCanvas";
}

/// Host-side functions invoked by the emitters (render → host).
pub mod entry_points {
    pub const SEND_LOCAL_TRANSFORM: &str = "SendLocalTransform";
    pub const REQUEST_SPAWN: &str = "RequestSpawn";
    pub const REQUEST_DESPAWN: &str = "RequestDespawn";
    pub const REQUEST_OWNERSHIP: &str = "RequestOwnership";
    pub const SEND_CUSTOM_EVENT: &str = "SendCustomEvent";

    pub const MEDIA_SCREEN_CLICKED: &str = "OnMediaScreenClicked";
    pub const PLAY_MEDIA_SCREEN_VIDEO: &str = "PlayMediaScreenVideo";
    pub const PORTAL_CLICKED: &str = "OnPortalClicked";
    pub const SEATING_HOTSPOT_CLICKED: &str = "OnSeatingHotspotClicked";
    pub const VIDEO_CANVAS_CLICKED: &str = "OnVideoCanvasClicked";
    pub const PLAY_VIDEO_CANVAS: &str = "PlayVideoCanvas";

    pub const REGISTER_MEDIA_SCREEN: &str = "RegisterMediaScreen";
    pub const REGISTER_PORTAL: &str = "RegisterPortal";
    pub const REGISTER_SEATING_HOTSPOT: &str = "RegisterSeatingHotspot";
    pub const REGISTER_VIDEO_CANVAS: &str = "RegisterVideoCanvas";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_update_null_fields_are_none() {
        let u: ActorUpdate =
            serde_json::from_str(r#"{"actorId":"a1","position":null,"animation":"wave"}"#)
                .unwrap();
        assert!(u.position.is_none());
        assert!(u.rotation.is_none());
        assert_eq!(u.animation.as_deref(), Some("wave"));
        assert!(u.is_speaking.is_none());
    }

    #[test]
    fn actor_joined_defaults_missing_fields() {
        let j: ActorJoined = serde_json::from_str(r#"{"actorId":"a1"}"#).unwrap();
        assert_eq!(j.display_name, "");
        assert!(j.position.is_none());
    }

    #[test]
    fn spawn_request_omits_missing_prefab() {
        let req = SpawnRequest {
            object_type: "chair".into(),
            position: Vec3::zero(),
            rotation: Quat::identity(),
            prefab_id: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["objectType"], "chair");
        assert!(json.get("prefabId").is_none());
    }
}
