//! Hotspot detection in glTF / GLB scenes.
//!
//! Space scenes mark addressable entities by node name:
//!
//! | prefix    | kind           | example          |
//! |-----------|----------------|------------------|
//! | `screen_` | MediaScreen    | `screen_lobby`   |
//! | `portal_` | Portal         | `Portal_Exit`    |
//! | `seat_`   | SeatingHotspot | `seat_bench_01`  |
//! | `video_`  | VideoCanvas    | `video_stage`    |
//!
//! Matching is case-insensitive. The remainder of the name is the entity
//! identity. Transforms are composed down the hierarchy so every detected
//! hotspot carries its world-space placement.

use gltf::Gltf;

use crate::error::BridgeResult;
use crate::renderable::EntityKind;
use crate::types::Transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotRule {
    pub prefix: String,
    pub kind: EntityKind,
}

impl HotspotRule {
    pub fn new(prefix: &str, kind: EntityKind) -> Self {
        Self {
            prefix: prefix.to_ascii_lowercase(),
            kind,
        }
    }

    fn matches<'a>(&self, name: &'a str) -> Option<&'a str> {
        let head = name.get(..self.prefix.len())?;
        if head.eq_ignore_ascii_case(&self.prefix) {
            Some(&name[self.prefix.len()..])
        } else {
            None
        }
    }
}

pub fn default_rules() -> Vec<HotspotRule> {
    vec![
        HotspotRule::new("screen_", EntityKind::MediaScreen),
        HotspotRule::new("portal_", EntityKind::Portal),
        HotspotRule::new("seat_", EntityKind::SeatingHotspot),
        HotspotRule::new("video_", EntityKind::VideoCanvas),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHotspot {
    pub kind: EntityKind,
    pub id: String,
    pub node_name: String,
    /// World-space placement.
    pub transform: Transform,
}

/// Parse a `.gltf` (JSON) or `.glb` buffer and scan it.
pub fn detect_in_slice(bytes: &[u8], rules: &[HotspotRule]) -> BridgeResult<Vec<DetectedHotspot>> {
    let gltf = Gltf::from_slice(bytes)?;
    Ok(detect(&gltf.document, rules))
}

/// Scan the default scene, or every scene when none is marked default.
pub fn detect(document: &gltf::Document, rules: &[HotspotRule]) -> Vec<DetectedHotspot> {
    let mut found = Vec::new();
    let root = glam::Affine3A::IDENTITY;

    match document.default_scene() {
        Some(scene) => {
            for node in scene.nodes() {
                visit(&node, &root, rules, &mut found);
            }
        }
        None => {
            for scene in document.scenes() {
                for node in scene.nodes() {
                    visit(&node, &root, rules, &mut found);
                }
            }
        }
    }

    log::debug!("[hotspots] {} hotspot(s) detected", found.len());
    found
}

fn visit(
    node: &gltf::Node,
    parent: &glam::Affine3A,
    rules: &[HotspotRule],
    out: &mut Vec<DetectedHotspot>,
) {
    let local = glam::Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = *parent * glam::Affine3A::from_mat4(local);

    if let Some(name) = node.name() {
        if let Some((rule, rest)) = rules
            .iter()
            .find_map(|r| r.matches(name).map(|rest| (r, rest)))
        {
            let id = rest.trim_matches(|c: char| c == '_' || c == '-' || c.is_whitespace());
            let id = if id.is_empty() { name } else { id };
            out.push(DetectedHotspot {
                kind: rule.kind,
                id: id.to_string(),
                node_name: name.to_string(),
                transform: Transform::from_affine(world),
            });
        }
    }

    for child in node.children() {
        visit(&child, &world, rules, out);
    }
}
