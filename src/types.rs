//! Wire-level math and transform types shared across all modules.
//!
//! The structs here only carry the `{x, y, z}` / `{x, y, z, w}` JSON shape;
//! the arithmetic goes through `glam`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub fn lerp(self, to: Vec3, t: f32) -> Vec3 {
        glam::Vec3::from(self).lerp(to.into(), t).into()
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Quat
// ---------------------------------------------------------------------------

/// Unit quaternion, `{x, y, z, w}` on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        glam::Quat::IDENTITY.into()
    }

    /// Rotation of `angle` radians about the Y (up) axis.
    pub fn from_rotation_y(angle: f32) -> Self {
        glam::Quat::from_rotation_y(angle).into()
    }

    /// Unit-length copy. Degenerate or non-finite input becomes identity.
    pub fn normalized(self) -> Quat {
        let q = glam::Quat::from(self);
        if !q.is_finite() || q.length_squared() <= f32::EPSILON {
            return Quat::identity();
        }
        q.normalize().into()
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(self, to: Quat, t: f32) -> Quat {
        glam::Quat::from(self).slerp(to.into(), t).into()
    }

    pub fn rotate(self, v: Vec3) -> Vec3 {
        glam::Quat::from(self).mul_vec3(v.into()).into()
    }

    /// Angle between two rotations in radians.
    pub fn angle_to(self, o: Quat) -> f32 {
        glam::Quat::from(self).angle_between(o.into())
    }
}

impl From<[f32; 4]> for Quat {
    fn from(v: [f32; 4]) -> Self {
        Quat::new(v[0], v[1], v[2], v[3])
    }
}

impl From<glam::Quat> for Quat {
    fn from(q: glam::Quat) -> Self {
        Quat::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Quat> for glam::Quat {
    fn from(q: Quat) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            rotation: Quat::identity(),
            scale: Vec3::one(),
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn to_affine(&self) -> glam::Affine3A {
        glam::Affine3A::from_scale_rotation_translation(
            self.scale.into(),
            self.rotation.normalized().into(),
            self.position.into(),
        )
    }

    /// Decompose an affine matrix. Shear is dropped.
    pub fn from_affine(m: glam::Affine3A) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self::new(position.into(), rotation.into(), scale.into())
    }

    /// Compose `self` (parent) with `child` (local) into a world transform.
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform::from_affine(self.to_affine() * child.to_affine())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunables for [`SpacesBridge`](crate::bridge::SpacesBridge).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on local-transform sends per second.
    pub send_rate_hz: f32,
    /// Exponential smoothing speed for remote positions (per second).
    pub position_lerp_speed: f32,
    /// Exponential smoothing speed for remote rotations (per second).
    pub rotation_lerp_speed: f32,
    /// Visual used for remote actors; `None` falls back to a capsule.
    pub actor_prefab: Option<String>,
    /// Object type → prefab. Types without an entry use `prefabId` from the
    /// spawn message, then the capsule fallback.
    pub object_prefabs: HashMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            send_rate_hz: 20.0,
            position_lerp_speed: 10.0,
            rotation_lerp_speed: 10.0,
            actor_prefab: None,
            object_prefabs: HashMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Minimum spacing between two local-transform sends, in seconds.
    pub fn send_interval(&self) -> f64 {
        if self.send_rate_hz <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.send_rate_hz as f64
        }
    }
}

/// Tunables for envelope ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Event a bare (non-envelope) payload is routed to. `None` drops it.
    pub bare_payload_event: Option<String>,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            bare_payload_event: Some(crate::protocol::events::SET_PORTAL_IMAGE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn slerp_endpoints() {
        let a = Quat::identity();
        let b = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let s0 = a.slerp(b, 0.0);
        let s1 = a.slerp(b, 1.0);
        assert!(s0.angle_to(a) < 1e-3);
        assert!(s1.angle_to(b) < 1e-3);
    }

    #[test]
    fn slerp_halfway_is_half_angle() {
        let a = Quat::identity();
        let b = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mid = a.slerp(b, 0.5);
        assert!(close(mid.angle_to(a), std::f32::consts::FRAC_PI_4));
    }

    #[test]
    fn rotate_quarter_turn_about_y() {
        let q = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let v = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(close(v.x, 0.0));
        assert!(close(v.z, -1.0));
    }

    #[test]
    fn compose_applies_parent_scale_and_offset() {
        let parent = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::identity(),
            Vec3::new(2.0, 2.0, 2.0),
        );
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.compose(&child);
        assert!(close(world.position.x, 12.0));
        assert!(close(world.scale.x, 2.0));
    }

    #[test]
    fn compose_rotates_child_offset() {
        let parent = Transform::new(
            Vec3::zero(),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::one(),
        );
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.compose(&child);
        assert!(close(world.position.x, 0.0));
        assert!(close(world.position.z, -1.0));
        assert!(world.rotation.angle_to(parent.rotation) < 1e-3);
    }

    #[test]
    fn degenerate_rotation_normalizes_to_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalized(), Quat::identity());
        assert_eq!(Quat::new(f32::NAN, 0.0, 0.0, 1.0).normalized(), Quat::identity());
        let q = Quat::new(0.0, 0.0, 0.0, 2.0).normalized();
        assert!(close(q.w, 1.0));
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::zero());
        assert_eq!(t.rotation, Quat::identity());
        assert_eq!(t.scale, Vec3::one());
    }
}
