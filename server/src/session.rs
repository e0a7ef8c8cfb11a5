//! One game room: roster, board polygon, paddles, balls and the per-tick simulation.

use crate::ball::Ball;
use crate::board::{self, Layout};
use crate::connection::Connection;
use crate::paddle::{calculate_paddle, Paddle};
use crate::physics;
use crate::player::Player;
use crate::tween::{EaseDirection, Easing, Tween};
use npong_shared::config::GameConfig;
use npong_shared::protocol::{
    GameSummary, InfoMsg, PointWire, ServerMsg, UpdateMsg, PROTOCOL_VERSION,
};
use npong_shared::vec3::{vec2, Vec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_SESSION_NAME: &str = "Pong!";

/// Cosmetic paddle tilt after a hit: out to the tilt angle, then back to zero.
#[derive(Debug, Clone)]
struct PaddleTilt {
    player_id: String,
    tween: Tween<f64>,
    returning: bool,
}

pub struct Session {
    id: String,
    name: String,
    max_players: usize,
    public: bool,
    config: Arc<GameConfig>,
    players: Vec<Player>,
    /// player id -> index into `players`
    index: HashMap<String, usize>,
    board: Vec<Vec3>,
    balls: Vec<Ball>,
    /// Physics is frozen while the board is being reshaped or waiting for players.
    paused: bool,
    /// Board geometry goes out with snapshots while set.
    board_changed: bool,
    reshape: Option<Tween<Layout>>,
    tilts: Vec<PaddleTilt>,
    rng: ChaCha8Rng,
    faults: u32,
    #[cfg(test)]
    fail_next_update: bool,
}

impl Session {
    pub fn new(
        id: String,
        name: Option<String>,
        max_players: Option<usize>,
        public: bool,
        config: Arc<GameConfig>,
        rng: ChaCha8Rng,
    ) -> Self {
        let max_players = max_players
            .unwrap_or(config.max_players)
            .clamp(1, config.max_players.max(1));
        Self {
            id,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            max_players,
            public,
            config,
            players: Vec::new(),
            index: HashMap::new(),
            board: Vec::new(),
            balls: Vec::new(),
            paused: true,
            board_changed: false,
            reshape: None,
            tilts: Vec::new(),
            rng,
            faults: 0,
            #[cfg(test)]
            fail_next_update: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn has_player(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.index.get(id).map(|&i| &self.players[i])
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn board(&self) -> &[Vec3] {
        &self.board
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn board_changed(&self) -> bool {
        self.board_changed
    }

    pub fn is_reshaping(&self) -> bool {
        self.reshape.is_some()
    }

    /// Where the in-flight reshape is heading.
    pub fn reshape_target(&self) -> Option<&Layout> {
        self.reshape.as_ref().map(|r| r.target())
    }

    /// Number of faults the scheduler caught while driving this session.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub(crate) fn record_fault(&mut self) {
        self.faults += 1;
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            num_players: self.players.len() as u32,
            max_players: self.max_players as u32,
        }
    }

    fn center(&self) -> Vec3 {
        let c = self.config.board_center();
        vec2(c, c)
    }

    fn reindex(&mut self) {
        self.index = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
    }

    /// Add a player for `connection`. Returns `None` when the session is full
    /// or the connection already plays here.
    pub fn add_player(&mut self, connection: Connection, now: Instant) -> Option<&Player> {
        if self.is_full() {
            tracing::info!(session = %self.id, "session is full; can't add player");
            return None;
        }
        if self.has_player(connection.id()) {
            tracing::warn!(
                session = %self.id,
                player = %connection.id(),
                "player is already in this session"
            );
            return None;
        }

        let center = self.center();
        let size = self.players.len();
        let (paddle, edge) = match size {
            0 => (Paddle::new(center, PI), 0),
            1 => {
                // two-player court, grown out of the centre by the reshape
                self.board = vec![center; 4];
                self.players[0].edge = 0;
                (Paddle::new(center, PI), 2)
            }
            _ => {
                if size == 2 && self.board.len() == 4 {
                    // back from the court to a proper polygon
                    self.board = self.board[1..3].to_vec();
                    self.players[0].edge = 0;
                    self.players[1].edge = 1;
                }
                let anchor = self.board.last().copied().unwrap_or(center);
                self.board.push(anchor);
                let theta = self.players.last().map_or(PI, |p| p.paddle.theta);
                (Paddle::new(anchor, theta), size)
            }
        };
        if size % 2 == 0 {
            self.balls.push(Ball::new());
        }

        let player = Player::new(connection, paddle, edge, now);
        player.send(ServerMsg::Info(InfoMsg {
            protocol_version: PROTOCOL_VERSION,
            game_id: self.id.clone(),
            canvas_width: self.config.board_dimension,
            canvas_height: self.config.board_dimension,
            paddle_thickness: self.config.paddle_thickness,
            paddle_length: self.config.paddle_length,
            paddle_game_board_padding: self.config.paddle_board_padding,
            ball_radius: self.config.ball_radius,
        }));
        tracing::info!(session = %self.id, player = %player.id, edge, "player joined");

        self.index.insert(player.id.clone(), self.players.len());
        self.players.push(player);
        self.reshape(now);

        self.players.last()
    }

    /// Remove a player and close their connection. The caller is responsible
    /// for dropping the session once it is empty.
    pub fn remove_player(&mut self, id: &str, now: Instant) -> Option<Player> {
        let Some(i) = self.index.get(id).copied() else {
            tracing::info!(session = %self.id, player = %id, "player is not in this session");
            return None;
        };

        let player = self.players.remove(i);
        player.close();
        self.reindex();
        self.tilts.retain(|t| t.player_id != id);

        match self.players.len() {
            0 | 1 => {
                self.board.clear();
                if let Some(last) = self.players.first_mut() {
                    last.edge = 0;
                }
            }
            2 => {
                // polygon back to the court: duplicate the corner where the player left
                if !self.board.is_empty() {
                    let at = i.min(self.board.len() - 1);
                    let corner = self.board[at];
                    self.board.insert(at, corner);
                }
                self.players[0].edge = 0;
                self.players[1].edge = 2;
            }
            _ => {
                if i < self.board.len() {
                    self.board.remove(i);
                }
                for p in &mut self.players[i..] {
                    p.edge = p.edge.saturating_sub(1);
                }
            }
        }
        if self.players.len() % 2 == 0 {
            self.balls.pop();
        }
        tracing::info!(session = %self.id, player = %id, "player left");

        if !self.players.is_empty() {
            self.reshape(now);
        }
        Some(player)
    }

    /// Start animating the board towards the layout for the current roster.
    /// Any reshape already in flight is dropped without completing.
    fn reshape(&mut self, now: Instant) {
        self.paused = true;
        self.reshape = None;
        self.board_changed = true;

        let target = match self.players.len() {
            // empty sessions are torn down by the scheduler; a lone player waits
            0 | 1 => return,
            2 => board::two_player_layout(&self.config),
            n => board::polygon_layout(n, &self.config),
        };
        let from = Layout {
            board: self.board.clone(),
            paddles: self.players.iter().map(|p| p.paddle).collect(),
        };
        tracing::debug!(session = %self.id, players = self.players.len(), "reshaping board");
        self.reshape = Some(Tween::new(
            from,
            target,
            now,
            self.config.reshape_duration(),
        ));
    }

    fn finish_reshape(&mut self, now: Instant) {
        self.paused = false;
        for ball in &mut self.balls {
            reset_ball(ball, &self.board, &self.config, &mut self.rng, now);
        }
        tracing::debug!(session = %self.id, "board settled");
    }

    /// Advance board and paddle animations. Driven by the interpolation clock.
    pub fn animate(&mut self, now: Instant) {
        if let Some(reshape) = &self.reshape {
            let layout = reshape.sample(now);
            let finished = reshape.is_finished(now);
            self.board = layout.board;
            for (player, paddle) in self.players.iter_mut().zip(layout.paddles) {
                player.paddle.position = paddle.position;
                player.paddle.theta = paddle.theta;
            }
            if finished {
                self.reshape = None;
                self.finish_reshape(now);
            }
        }
        self.step_tilts(now);
    }

    fn step_tilts(&mut self, now: Instant) {
        let phase = self.config.paddle_tilt_phase();
        let players = &mut self.players;
        let index = &self.index;
        self.tilts.retain_mut(|tilt| {
            let value = tilt.tween.sample(now);
            if let Some(&i) = index.get(&tilt.player_id) {
                players[i].paddle.tilt = value;
            }
            if !tilt.tween.is_finished(now) {
                return true;
            }
            if tilt.returning {
                return false;
            }
            tilt.tween =
                Tween::new(value, 0.0, now, phase).with_easing(Easing::Sine, EaseDirection::In);
            tilt.returning = true;
            true
        });
    }

    fn start_tilt(&mut self, player_index: usize, offset: f64, now: Instant) {
        let Some(player) = self.players.get(player_index) else {
            return;
        };
        let target = physics::paddle_tilt(offset, &self.config);
        let tween = Tween::new(
            player.paddle.tilt,
            target,
            now,
            self.config.paddle_tilt_phase(),
        )
        .with_easing(Easing::Sine, EaseDirection::Out);
        let player_id = player.id.clone();
        self.tilts.retain(|t| t.player_id != player_id);
        self.tilts.push(PaddleTilt {
            player_id,
            tween,
            returning: false,
        });
    }

    /// One simulation step: idle kicks, ball physics, then a snapshot to every player.
    pub fn update(&mut self, now: Instant) {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_update) {
            panic!("injected fault in session {}", self.id);
        }

        if let Some(limit) = self.config.idle_kick_after() {
            self.kick_idle_players(now, limit);
        }
        for ball in &mut self.balls {
            ball.release_if_due(now);
        }
        self.update_balls(now);
        self.broadcast();
    }

    fn update_balls(&mut self, now: Instant) {
        if self.paused {
            return;
        }
        let config = &*self.config;
        let mut hits = Vec::new();

        for ball in self.balls.iter_mut() {
            if ball.is_paused() {
                continue;
            }
            ball.accelerate(config.tick_acceleration(), config.max_tick_velocity());
            ball.advance();

            for (i, player) in self.players.iter_mut().enumerate() {
                let Some(contact) = physics::paddle_contact(&player.paddle, ball.position, config)
                else {
                    continue;
                };
                player.hits += 1;
                let perturbation = physics::bounce_perturbation(&mut self.rng, config);
                ball.velocity =
                    physics::deflect_off_paddle(ball.velocity, player.paddle.theta, perturbation);
                hits.push((i, contact.offset));
                tracing::debug!(session = %self.id, player = %player.id, "ball hit paddle");
                break;
            }

            if let Some(crossing) = physics::edge_crossing(&self.board, ball.position) {
                let perturbation = physics::bounce_perturbation(&mut self.rng, config);
                ball.velocity =
                    physics::deflect_off_edge(ball.velocity, crossing.theta, perturbation);
                match self.players.iter_mut().find(|p| p.edge == crossing.edge) {
                    Some(player) => {
                        player.misses += 1;
                        reset_ball(ball, &self.board, config, &mut self.rng, now);
                        tracing::debug!(session = %self.id, player = %player.id, "goal");
                    }
                    None => {
                        tracing::debug!(session = %self.id, edge = crossing.edge, "ball hit wall");
                    }
                }
            }
        }

        for (i, offset) in hits {
            self.start_tilt(i, offset, now);
        }
    }

    /// Snapshot of paddles and balls, with the board when it is changing.
    /// `me` and `e` are filled in per receiver.
    pub fn snapshot(&self, include_board: bool) -> UpdateMsg {
        UpdateMsg {
            pp: self.players.iter().map(Player::to_wire).collect(),
            b: self.balls.iter().map(Ball::to_wire).collect(),
            p: include_board.then(|| {
                self.board
                    .iter()
                    .map(|v| PointWire { x: v.x, y: v.y })
                    .collect()
            }),
            me: 0,
            e: 0,
        }
    }

    fn broadcast(&mut self) {
        if self.players.is_empty() {
            return;
        }
        let include_board = self.board_changed;
        // keep sending the board while it moves, plus once after it settles
        if include_board && self.reshape.is_none() {
            self.board_changed = false;
        }
        let snapshot = self.snapshot(include_board);
        for (i, player) in self.players.iter().enumerate() {
            let mut msg = snapshot.clone();
            msg.me = i as u32;
            msg.e = player.edge as u32;
            player.send(ServerMsg::Update(msg));
        }
    }

    /// Move a player's paddle to `(x, y)` on their edge. Positions off the
    /// edge are logged and ignored. Returns whether the paddle moved.
    pub fn update_player_position(&mut self, id: &str, x: f64, y: f64, now: Instant) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let epsilon = self.config.position_epsilon;
        let padding = self.config.paddle_board_padding;
        let player = &mut self.players[i];
        player.last_seen = now;

        let Some((a, b)) = board::edge(&self.board, player.edge) else {
            tracing::debug!(session = %self.id, player = %id, "no edge to move on yet");
            return false;
        };
        let point = vec2(x, y);
        if let Err(violation) = board::check_point_on_edge(a, b, point, epsilon) {
            tracing::debug!(
                session = %self.id,
                player = %id,
                edge = player.edge,
                x,
                y,
                "invalid paddle position: {}",
                violation
            );
            return false;
        }

        let tilt = player.paddle.tilt;
        let contact = board::snap_to_edge(a, b, point);
        player.paddle = calculate_paddle(a, b, Some(contact), padding);
        player.paddle.tilt = tilt;
        true
    }

    /// Kick players that have been silent for longer than `limit`.
    /// A player alone in a session is never kicked.
    pub fn kick_idle_players(&mut self, now: Instant, limit: Duration) -> Vec<String> {
        if self.players.len() < 2 {
            for p in &mut self.players {
                p.last_seen = now;
            }
            return Vec::new();
        }
        let idle: Vec<String> = self
            .players
            .iter()
            .filter(|p| now.saturating_duration_since(p.last_seen) > limit)
            .map(|p| p.id.clone())
            .collect();
        for id in &idle {
            if let Some(player) = self.player(id) {
                tracing::info!(session = %self.id, player = %id, "kicking idle player");
                player.send(ServerMsg::Kick);
            }
            self.remove_player(id, now);
        }
        idle
    }

    #[cfg(test)]
    pub(crate) fn inject_update_fault(&mut self) {
        self.fail_next_update = true;
    }
}

/// Serve a ball from the middle of the board in a random direction, frozen for the reset pause.
fn reset_ball(ball: &mut Ball, board: &[Vec3], config: &GameConfig, rng: &mut ChaCha8Rng, now: Instant) {
    let angle = rng.gen_range(0.0..TAU);
    ball.reset(
        board::serve_point(board, config),
        config.tick_acceleration(),
        angle,
        now + config.ball_reset_pause(),
    );
}
