//! N-player pong server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod ball;
pub mod board;
pub mod config;
pub mod connection;
pub mod game_loop;
pub mod paddle;
pub mod physics;
pub mod player;
pub mod scheduler;
pub mod session;
pub mod tween;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use config::ServerConfig;
use game_loop::{run_game_loop, GameCommand};
use ws::{ws_handler, AppState};

/// Spawn the game loop and build the router serving `/ws` and the static client.
pub fn build_app(config: ServerConfig) -> Router {
    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let static_dir = config.static_dir.clone();
    let app_state = AppState {
        game_tx,
        player_buffer: config.player_buffer,
    };

    tokio::spawn(async move {
        run_game_loop(game_rx, config).await;
    });

    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
