//! Time-based interpolation of game geometry.
//!
//! A [`Tween`] is a one-shot task that moves a value from a start state to a
//! target over a fixed duration along an easing curve. Tweens hold no
//! callbacks: the owner samples them from the interpolation driver and runs
//! its own completion step once [`Tween::is_finished`] reports true. Dropping
//! a tween cancels it, and a cancelled tween never completes.

use npong_shared::vec3::{self, Vec3};
use std::time::{Duration, Instant};

/// Values that can be linearly interpolated.
pub trait Lerp: Clone {
    fn lerp(&self, to: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        vec3::lerp(*self, *to, t)
    }
}

/// Element-wise; extra elements on either side keep the start value.
impl<T: Lerp> Lerp for Vec<T> {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self.iter()
            .enumerate()
            .map(|(i, from)| match to.get(i) {
                Some(target) => from.lerp(target, t),
                None => from.clone(),
            })
            .collect()
    }
}

/// Easing curve family. Each curve is defined in its ease-out form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Easing {
    Linear,
    Sine,
    #[default]
    Exponential,
    Back,
    Bounce,
    Elastic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EaseDirection {
    In,
    #[default]
    Out,
}

impl Easing {
    fn ease_out(self, p: f64) -> f64 {
        match self {
            Easing::Linear => p,
            Easing::Sine => (p * std::f64::consts::FRAC_PI_2).sin(),
            Easing::Exponential => {
                if p >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * p)
                }
            }
            Easing::Back => {
                let s = 1.70158;
                let q = p - 1.0;
                q * q * ((s + 1.0) * q + s) + 1.0
            }
            Easing::Bounce => {
                let a = 7.5625;
                let d = 2.75;
                if p < 1.0 / d {
                    a * p * p
                } else if p < 2.0 / d {
                    let q = p - 1.5 / d;
                    a * q * q + 0.75
                } else if p < 2.5 / d {
                    let q = p - 2.25 / d;
                    a * q * q + 0.9375
                } else {
                    let q = p - 2.625 / d;
                    a * q * q + 0.984375
                }
            }
            Easing::Elastic => {
                1.0 - (p * 4.5 * std::f64::consts::PI).cos() * (-p * 6.0).exp()
            }
        }
    }

    /// Map linear progress `p` in `[0, 1]` onto the curve.
    pub fn apply(self, direction: EaseDirection, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        match direction {
            EaseDirection::Out => self.ease_out(p),
            EaseDirection::In => 1.0 - self.ease_out(1.0 - p),
        }
    }
}

/// A one-shot interpolation from `from` to `to`.
#[derive(Debug, Clone)]
pub struct Tween<T> {
    from: T,
    to: T,
    started: Instant,
    duration: Duration,
    easing: Easing,
    direction: EaseDirection,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
            easing: Easing::default(),
            direction: EaseDirection::default(),
        }
    }

    pub fn with_easing(mut self, easing: Easing, direction: EaseDirection) -> Self {
        self.easing = easing;
        self.direction = direction;
        self
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    /// Interpolated value at `now`. Exactly the target once finished.
    pub fn sample(&self, now: Instant) -> T {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to.clone();
        }
        self.from.lerp(&self.to, self.easing.apply(self.direction, p))
    }

    pub fn target(&self) -> &T {
        &self.to
    }
}
