//! Board geometry: target layouts for each roster size and edge membership tests.

use crate::paddle::{calculate_paddle, Paddle};
use crate::tween::Lerp;
use npong_shared::config::GameConfig;
use npong_shared::vec3::{self, vec2, Vec3};
use std::f64::consts::TAU;

/// Board vertices plus one paddle per player, in roster order.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub board: Vec<Vec3>,
    pub paddles: Vec<Paddle>,
}

impl Lerp for Layout {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            board: self.board.lerp(&to.board, t),
            paddles: self.paddles.lerp(&to.paddles, t),
        }
    }
}

/// The two-player court: a wide rectangle with the players on the right
/// (edge 0) and left (edge 2) sides. Edges 1 and 3 are walls.
pub fn two_player_layout(config: &GameConfig) -> Layout {
    let d = config.board_dimension;
    let top = d / 4.0 - 1.0;
    let bottom = d / 4.0 + d / 2.0 - 1.0;
    let board = vec![
        vec2(d - 1.0, top),
        vec2(d - 1.0, bottom),
        vec2(0.0, bottom),
        vec2(0.0, top),
    ];
    let paddles = vec![
        calculate_paddle(board[0], board[1], None, config.paddle_board_padding),
        calculate_paddle(board[2], board[3], None, config.paddle_board_padding),
    ];
    Layout { board, paddles }
}

/// A regular `n`-gon inscribed in the board square, vertex `i` at angle `i * 2pi / n`,
/// with each player's paddle centred on its edge.
pub fn polygon_layout(n: usize, config: &GameConfig) -> Layout {
    let radius = config.board_dimension - 1.0;
    let offset = vec2(radius, radius);
    let corner = |i: usize| {
        let theta = TAU * i as f64 / n as f64;
        let raw = vec2(theta.cos() * radius, theta.sin() * radius);
        vec3::scale(vec3::add(raw, offset), 0.5)
    };

    let mut board = Vec::with_capacity(n);
    let mut paddles = Vec::with_capacity(n);
    for i in 0..n {
        let a = corner(i);
        let b = corner(i + 1);
        board.push(a);
        paddles.push(calculate_paddle(a, b, None, config.paddle_board_padding));
    }
    Layout { board, paddles }
}

/// Endpoints of edge `index`, wrapping to the first vertex.
pub fn edge(board: &[Vec3], index: usize) -> Option<(Vec3, Vec3)> {
    if index >= board.len() {
        return None;
    }
    Some((board[index], board[(index + 1) % board.len()]))
}

/// Where balls are served from: the vertex average, or the canvas centre on an empty board.
pub fn serve_point(board: &[Vec3], config: &GameConfig) -> Vec3 {
    vec3::average(board).unwrap_or_else(|| {
        let c = config.board_center();
        vec2(c, c)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeViolation {
    /// A coordinate is NaN or infinite
    NonFinite,
    /// Zero-length edge and the point is not that single point
    DegenerateEdge,
    /// Point is not on the edge's supporting line
    OffLine,
    /// Point is on the line but beyond the edge's endpoints
    OutOfBounds,
}

impl std::fmt::Display for EdgeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeViolation::NonFinite => write!(f, "coordinates are not finite"),
            EdgeViolation::DegenerateEdge => write!(f, "edge is a single point"),
            EdgeViolation::OffLine => write!(f, "not on the edge line"),
            EdgeViolation::OutOfBounds => write!(f, "on the line but outside the edge"),
        }
    }
}

fn in_range(a: f64, b: f64, c: f64, epsilon: f64) -> bool {
    c >= a.min(b) - epsilon && c <= a.max(b) + epsilon
}

/// Check that `p` lies on the segment `a -> b` within `epsilon`.
pub fn check_point_on_edge(a: Vec3, b: Vec3, p: Vec3, epsilon: f64) -> Result<(), EdgeViolation> {
    if !p.is_finite() {
        return Err(EdgeViolation::NonFinite);
    }
    if a.x == b.x && a.y == b.y {
        return if p.x == a.x && p.y == a.y {
            Ok(())
        } else {
            Err(EdgeViolation::DegenerateEdge)
        };
    }

    if (a.x - b.x).abs() > epsilon {
        let slope = (a.y - b.y) / (a.x - b.x);
        let intercept = a.y - slope * a.x;
        if (p.y - (slope * p.x + intercept)).abs() > epsilon {
            return Err(EdgeViolation::OffLine);
        }
        if !in_range(a.x, b.x, p.x, epsilon) {
            return Err(EdgeViolation::OutOfBounds);
        }
    } else {
        // near-vertical
        if (p.x - (a.x + b.x) / 2.0).abs() > epsilon {
            return Err(EdgeViolation::OffLine);
        }
        if !in_range(a.y, b.y, p.y, epsilon) {
            return Err(EdgeViolation::OutOfBounds);
        }
    }
    Ok(())
}

/// The point on the line through `a -> b` closest to `p`.
pub fn snap_to_edge(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    vec3::add(a, vec3::project(vec3::sub(p, a), vec3::sub(b, a)))
}
