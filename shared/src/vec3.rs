/// 3D vector utilities for board geometry.
/// The board lives in the XY plane; Z is only used to build normals via the cross product.

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector along the Z axis (out of the board plane).
    pub const K: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Shorthand constructor for a point in the board plane.
pub fn vec2(x: f64, y: f64) -> Vec3 {
    Vec3::new(x, y, 0.0)
}

/// Dot product
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Cross product
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

/// Vector length
pub fn length(v: Vec3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Normalize vector to unit length. Degenerate vectors stay zero.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-10 {
        return Vec3::ZERO;
    }
    Vec3::new(v.x / len, v.y / len, v.z / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

/// Orientation of the vector about the Z axis, in radians.
pub fn orientation_z(v: Vec3) -> f64 {
    v.y.atan2(v.x)
}

/// Rotate vector about the Z axis by angle.
pub fn rotate_z(v: Vec3, angle: f64) -> Vec3 {
    let (sin_a, cos_a) = angle.sin_cos();
    Vec3 {
        x: v.x * cos_a - v.y * sin_a,
        y: v.x * sin_a + v.y * cos_a,
        z: v.z,
    }
}

/// Component-wise mean of a set of points. `None` for an empty set.
pub fn average(points: &[Vec3]) -> Option<Vec3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::ZERO, |acc, p| add(acc, *p));
    Some(scale(sum, 1.0 / points.len() as f64))
}

/// Midpoint of two points.
pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    scale(add(a, b), 0.5)
}

/// Project a onto b.
pub fn project(a: Vec3, b: Vec3) -> Vec3 {
    let denom = dot(b, b);
    if denom < 1e-20 {
        return Vec3::ZERO;
    }
    scale(b, dot(a, b) / denom)
}

/// Grow (or shrink) the vector's length by `delta`, keeping its direction.
/// A zero vector has no direction and is returned unchanged.
pub fn add_to_magnitude(v: Vec3, delta: f64) -> Vec3 {
    let len = length(v);
    if len < 1e-10 {
        return v;
    }
    scale(v, (len + delta).max(0.0) / len)
}

/// Linear interpolation between two points; t=0 returns a, t=1 returns b.
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    Vec3::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}
