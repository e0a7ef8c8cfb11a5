use crate::connection::Connection;
use crate::paddle::Paddle;
use npong_shared::protocol::{PaddleWire, ServerMsg};
use std::time::Instant;

/// A participant in one session, defending one board edge.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    connection: Connection,
    pub paddle: Paddle,
    /// Index of the board edge this player defends
    pub edge: usize,
    /// Balls this player hit back
    pub hits: u32,
    /// Balls that went through this player's edge
    pub misses: u32,
    pub last_seen: Instant,
}

impl Player {
    pub fn new(connection: Connection, paddle: Paddle, edge: usize, now: Instant) -> Self {
        Self {
            id: connection.id().to_string(),
            connection,
            paddle,
            edge,
            hits: 0,
            misses: 0,
            last_seen: now,
        }
    }

    pub fn score(&self) -> i32 {
        self.hits as i32 * 100 - self.misses as i32 * 200
    }

    /// Fire-and-forget; a failed send is logged and dropped.
    pub fn send(&self, msg: ServerMsg) {
        if let Err(e) = self.connection.send(msg) {
            tracing::warn!(player = %self.id, "could not send: {}", e);
        }
    }

    pub fn close(&self) {
        self.connection.close();
    }

    pub fn to_wire(&self) -> PaddleWire {
        self.paddle.to_wire(self.score())
    }
}
