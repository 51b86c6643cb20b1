//! Minimal 3D math for joint poses: vectors, unit quaternions, rigid poses.
//!
//! Quaternions are stored (x, y, z, w) to match the XR_EXT_hand_tracking
//! layout. World up is +Y.

use std::ops::{Add, Mul, Neg, Sub};

// ── Vec3 ───────────────────────────────────────────────────

/// 3D vector in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const RIGHT: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec3::ZERO;
        }
        self * (1.0 / len)
    }

    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }

    /// Angle between two vectors in degrees.
    pub fn angle_deg(self, other: Vec3) -> f32 {
        let denom = self.length() * other.length();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

// ── Quat ───────────────────────────────────────────────────

/// Rotation quaternion (x, y, z, w). Expected to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle_rad` around `axis` (right-handed).
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        let axis = axis.normalized();
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Rotation from Euler angles in degrees, applied Z first, then X, then Y.
    pub fn from_euler_deg(euler: Vec3) -> Self {
        let qx = Self::from_axis_angle(Vec3::RIGHT, euler.x.to_radians());
        let qy = Self::from_axis_angle(Vec3::UP, euler.y.to_radians());
        let qz = Self::from_axis_angle(Vec3::FORWARD, euler.z.to_radians());
        qy * qx * qz
    }

    pub fn dot(self, other: Quat) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn normalized(self) -> Quat {
        let len = self.dot(self).sqrt();
        if len <= f32::EPSILON {
            return Quat::IDENTITY;
        }
        let inv = 1.0 / len;
        Quat::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(u × v) + 2u × (u × v)
        let u = Vec3::new(self.x, self.y, self.z);
        let uv = u.cross(v);
        let uuv = u.cross(uv);
        v + uv * (2.0 * self.w) + uuv * 2.0
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(self, other: Quat, t: f32) -> Quat {
        let mut cos_theta = self.dot(other);
        let mut end = other;
        if cos_theta < 0.0 {
            cos_theta = -cos_theta;
            end = Quat::new(-other.x, -other.y, -other.z, -other.w);
        }

        // Nearly parallel: fall back to normalized lerp
        if cos_theta > 0.9995 {
            return Quat::new(
                self.x + (end.x - self.x) * t,
                self.y + (end.y - self.y) * t,
                self.z + (end.z - self.z) * t,
                self.w + (end.w - self.w) * t,
            )
            .normalized();
        }

        let theta = cos_theta.acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Quat::new(
            self.x * a + end.x * b,
            self.y * a + end.y * b,
            self.z * a + end.z * b,
            self.w * a + end.w * b,
        )
    }

    /// Inverse of a unit quaternion.
    pub fn conjugate(self) -> Quat {
        Quat::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Angular distance to another rotation in degrees.
    ///
    /// Taken from the relative rotation with `atan2`, which stays accurate
    /// near zero where `acos` of the dot product does not.
    pub fn angle_to_deg(self, other: Quat) -> f32 {
        let r = self.conjugate() * other;
        let v = (r.x * r.x + r.y * r.y + r.z * r.z).sqrt();
        (2.0 * v.atan2(r.w.abs())).to_degrees()
    }
}

impl Mul for Quat {
    type Output = Quat;
    /// Hamilton product: `self * rhs` applies `rhs` first.
    fn mul(self, rhs: Quat) -> Quat {
        Quat::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate(rhs)
    }
}

// ── Pose ───────────────────────────────────────────────────

/// Rigid pose: position plus rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `local_offset` in this pose's local frame, rotated by `local_rotation`.
    pub fn offset_by(&self, local_offset: Vec3, local_rotation: Quat) -> Pose {
        Pose {
            position: self.position + self.rotation * local_offset,
            rotation: self.rotation * local_rotation,
        }
    }

    /// Interpolate toward `target`: lerp position, slerp rotation.
    pub fn interpolate(&self, target: &Pose, t: f32) -> Pose {
        Pose {
            position: self.position.lerp(target.position, t),
            rotation: self.rotation.slerp(target.rotation, t),
        }
    }
}
