use crate::tween::Lerp;
use npong_shared::protocol::{round2, PaddleWire};
use npong_shared::vec3::{self, Vec3};

/// A player's paddle. `theta` is the orientation of the paddle's long axis.
/// `tilt` is a cosmetic offset shown to clients after a hit; collision math ignores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub position: Vec3,
    pub theta: f64,
    pub tilt: f64,
}

impl Paddle {
    pub fn new(position: Vec3, theta: f64) -> Self {
        Self {
            position,
            theta,
            tilt: 0.0,
        }
    }

    /// Express a board point in the paddle frame: x along the paddle, +y out of its face.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        vec3::rotate_z(vec3::sub(point, self.position), -self.theta)
    }

    pub fn to_wire(&self, score: i32) -> PaddleWire {
        PaddleWire {
            x: round2(self.position.x),
            y: round2(self.position.y),
            t: self.theta + self.tilt,
            s: score,
        }
    }
}

/// Interpolates placement only; the tilt stays with the paddle being animated.
impl Lerp for Paddle {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            position: vec3::lerp(self.position, to.position, t),
            theta: self.theta + (to.theta - self.theta) * t,
            tilt: self.tilt,
        }
    }
}

/// Place a paddle on the edge `a -> b`.
///
/// The paddle sits `padding` away from `contact` (the edge midpoint when not
/// given) along `(a - b) x k`, which points into the board for
/// counter-clockwise boards, and is oriented along `b - a`.
pub fn calculate_paddle(a: Vec3, b: Vec3, contact: Option<Vec3>, padding: f64) -> Paddle {
    let normal = vec3::cross(vec3::sub(a, b), Vec3::K);
    let contact = contact.unwrap_or_else(|| vec3::midpoint(a, b));
    Paddle::new(
        vec3::add(contact, vec3::scale(vec3::normalize(normal), padding)),
        vec3::orientation_z(vec3::sub(b, a)),
    )
}
