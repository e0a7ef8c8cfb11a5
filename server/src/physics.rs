//! Collision tests and rebound math for balls against paddles and board edges.

use crate::paddle::Paddle;
use npong_shared::config::{BounceDistribution, GameConfig};
use npong_shared::vec3::{self, Vec3};
use rand::Rng;

/// Where a ball touched a paddle, in the paddle frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddleContact {
    /// Offset along the paddle from its centre
    pub offset: f64,
}

/// Axis-aligned box test in the paddle frame, inflated by the ball radius.
pub fn paddle_contact(paddle: &Paddle, ball_pos: Vec3, config: &GameConfig) -> Option<PaddleContact> {
    let local = paddle.to_local(ball_pos);
    let half_length = config.paddle_length / 2.0 + config.ball_radius;
    let half_thickness = config.paddle_thickness / 2.0 + config.ball_radius;
    if local.x.abs() < half_length && local.y.abs() < half_thickness {
        Some(PaddleContact { offset: local.x })
    } else {
        None
    }
}

/// Velocity after bouncing off a paddle: the face-normal component always
/// points away from the paddle face, then the result is turned by `perturbation`.
pub fn deflect_off_paddle(velocity: Vec3, paddle_theta: f64, perturbation: f64) -> Vec3 {
    let mut local = vec3::rotate_z(velocity, -paddle_theta);
    local.y = local.y.abs();
    vec3::rotate_z(local, paddle_theta + perturbation)
}

/// Cosmetic tilt for a hit at `offset` along the paddle.
pub fn paddle_tilt(offset: f64, config: &GameConfig) -> f64 {
    2.0 * offset / config.paddle_length * -config.paddle_max_bounce
}

/// A ball that has left the board through an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCrossing {
    pub edge: usize,
    /// Orientation of `b1 - b2` for the crossed edge `(b1, b2)`
    pub theta: f64,
}

/// First edge the ball has crossed to the outside of, within the edge's extent.
pub fn edge_crossing(board: &[Vec3], ball_pos: Vec3) -> Option<EdgeCrossing> {
    let n = board.len();
    (0..n).find_map(|i| {
        let b1 = board[i];
        let b2 = board[(i + 1) % n];
        let e = vec3::sub(b1, b2);
        let theta = vec3::orientation_z(e);
        let local = vec3::rotate_z(vec3::sub(ball_pos, vec3::midpoint(b1, b2)), -theta);
        if local.y >= 0.0 && local.x.abs() < vec3::length(e) / 2.0 {
            Some(EdgeCrossing { edge: i, theta })
        } else {
            None
        }
    })
}

/// Velocity after bouncing off an edge: the outward component is turned back into the board.
pub fn deflect_off_edge(velocity: Vec3, edge_theta: f64, perturbation: f64) -> Vec3 {
    let mut local = vec3::rotate_z(velocity, -edge_theta);
    local.y = -local.y.abs();
    vec3::rotate_z(local, edge_theta + perturbation)
}

/// Random angle added to every rebound.
pub fn bounce_perturbation(rng: &mut impl Rng, config: &GameConfig) -> f64 {
    let max = config.paddle_max_bounce;
    match config.bounce_distribution {
        BounceDistribution::Uniform => {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            sign * rng.gen::<f64>() * max
        }
        BounceDistribution::Legacy => rng.gen::<f64>().round() * -1.0 * rng.gen::<f64>() * max,
    }
}
