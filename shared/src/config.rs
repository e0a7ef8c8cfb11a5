use std::time::Duration;

/// How the random rebound perturbation is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceDistribution {
    /// Sign chosen uniformly, magnitude uniform in `[0, max]`.
    #[default]
    Uniform,
    /// `round(r1) * -1 * r2 * max`: half the draws are exactly zero, the rest
    /// fall in `[-max, 0]`. Kept for clients tuned against the first server.
    Legacy,
}

/// Board and physics tuning, shared by every session of a server.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// Side of the square canvas the board is inscribed in (pixels)
    pub board_dimension: f64,
    pub max_players: usize,
    /// Scheduler tick period (ms)
    pub update_interval_ms: u64,
    /// Terminal ball speed (pixels per second)
    pub ball_max_velocity: f64,
    /// Ball speed-up (pixels per second^2)
    pub ball_acceleration: f64,
    pub ball_radius: f64,
    /// Freeze after a ball is reset (ms)
    pub ball_reset_pause_ms: u64,
    pub paddle_length: f64,
    pub paddle_thickness: f64,
    /// Maximum rebound perturbation (radians)
    pub paddle_max_bounce: f64,
    /// Distance between a paddle and its board edge
    pub paddle_board_padding: f64,
    pub position_epsilon: f64,
    /// Board reshape animation length (ms)
    pub reshape_duration_ms: u64,
    /// Full cosmetic paddle tilt cycle (ms); each phase takes a quarter
    pub paddle_hit_animation_ms: u64,
    /// Kick players silent for this long. Disabled when `None`.
    pub idle_kick_after_ms: Option<u64>,
    pub bounce_distribution: BounceDistribution,
    /// Frequency of the interpolation driver
    pub animation_fps: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_dimension: 700.0,
            max_players: 10,
            update_interval_ms: 30,
            ball_max_velocity: 100.0,
            ball_acceleration: 30.0,
            ball_radius: 5.0,
            ball_reset_pause_ms: 1000,
            paddle_length: 50.0,
            paddle_thickness: 10.0,
            paddle_max_bounce: 15f64.to_radians(),
            paddle_board_padding: 20.0,
            position_epsilon: 1.0,
            reshape_duration_ms: 1000,
            paddle_hit_animation_ms: 500,
            idle_kick_after_ms: None,
            bounce_distribution: BounceDistribution::Uniform,
            animation_fps: 100,
        }
    }
}

impl GameConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn animation_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.animation_fps.max(1) as f64)
    }

    /// Speed cap expressed per tick.
    pub fn max_tick_velocity(&self) -> f64 {
        self.ball_max_velocity / self.update_interval_ms as f64
    }

    /// Speed gained per tick while below the cap.
    pub fn tick_acceleration(&self) -> f64 {
        self.ball_acceleration / self.update_interval_ms as f64
    }

    pub fn ball_reset_pause(&self) -> Duration {
        Duration::from_millis(self.ball_reset_pause_ms)
    }

    pub fn reshape_duration(&self) -> Duration {
        Duration::from_millis(self.reshape_duration_ms)
    }

    /// Duration of one tilt phase (out, or back).
    pub fn paddle_tilt_phase(&self) -> Duration {
        Duration::from_millis(self.paddle_hit_animation_ms / 4)
    }

    pub fn idle_kick_after(&self) -> Option<Duration> {
        self.idle_kick_after_ms.map(Duration::from_millis)
    }

    /// Center of the board canvas. Pixel coordinates are zero-based, hence the `- 1`.
    pub fn board_center(&self) -> f64 {
        self.board_dimension / 2.0 - 1.0
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("board_dimension", self.board_dimension),
            ("ball_max_velocity", self.ball_max_velocity),
            ("ball_radius", self.ball_radius),
            ("paddle_length", self.paddle_length),
            ("paddle_thickness", self.paddle_thickness),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be finite and > 0"));
            }
        }
        let non_negative = [
            ("ball_acceleration", self.ball_acceleration),
            ("paddle_board_padding", self.paddle_board_padding),
            ("position_epsilon", self.position_epsilon),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be finite and >= 0"));
            }
        }
        if !self.paddle_max_bounce.is_finite()
            || self.paddle_max_bounce < 0.0
            || self.paddle_max_bounce > std::f64::consts::FRAC_PI_2
        {
            return Err("paddle_max_bounce must be within [0, PI/2]".to_string());
        }
        if self.max_players < 1 {
            return Err("max_players must be >= 1".to_string());
        }
        if self.update_interval_ms == 0 {
            return Err("update_interval_ms must be > 0".to_string());
        }
        if self.animation_fps == 0 {
            return Err("animation_fps must be > 0".to_string());
        }
        if self.idle_kick_after_ms == Some(0) {
            return Err("idle_kick_after_ms must be > 0 when set".to_string());
        }
        Ok(())
    }
}
