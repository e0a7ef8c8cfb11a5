use npong_shared::protocol::{round2, PointWire};
use npong_shared::vec3::{self, Vec3};
use std::time::Instant;

/// A ball in play. Velocity is expressed in pixels per tick.
#[derive(Debug, Clone)]
pub struct Ball {
    pub position: Vec3,
    pub velocity: Vec3,
    paused: bool,
    resume_at: Option<Instant>,
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

impl Ball {
    /// A new ball starts frozen until it is reset onto the board.
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            paused: true,
            resume_at: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freeze the ball until `at`. Replaces any earlier pending release.
    pub fn pause_until(&mut self, at: Instant) {
        self.paused = true;
        self.resume_at = Some(at);
    }

    /// Unfreeze the ball once its release time has passed.
    pub fn release_if_due(&mut self, now: Instant) -> bool {
        match self.resume_at {
            Some(at) if self.paused && now >= at => {
                self.resume();
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.resume_at = None;
    }

    /// Put the ball at `center` moving with `speed` along both axes, rotated by `angle`,
    /// frozen until `resume_at`.
    pub fn reset(&mut self, center: Vec3, speed: f64, angle: f64, resume_at: Instant) {
        self.position = center;
        self.velocity = vec3::rotate_z(vec3::vec2(speed, speed), angle);
        self.pause_until(resume_at);
    }

    /// Speed the ball up by `acceleration`, never beyond `max_speed`.
    pub fn accelerate(&mut self, acceleration: f64, max_speed: f64) {
        let speed = vec3::length(self.velocity);
        if speed < max_speed {
            let target = (speed + acceleration).min(max_speed);
            self.velocity = vec3::add_to_magnitude(self.velocity, target - speed);
        }
    }

    pub fn advance(&mut self) {
        self.position = vec3::add(self.position, self.velocity);
    }

    pub fn speed(&self) -> f64 {
        vec3::length(self.velocity)
    }

    pub fn to_wire(&self) -> PointWire {
        PointWire {
            x: round2(self.position.x),
            y: round2(self.position.y),
        }
    }
}
