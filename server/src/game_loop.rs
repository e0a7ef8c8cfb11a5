use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::scheduler::{JoinError, Scheduler};
use npong_shared::protocol::GameSummary;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

/// Commands from client connections to the game loop
pub enum GameCommand {
    Create {
        connection: Connection,
        name: Option<String>,
        max_players: Option<usize>,
        public: bool,
        response: oneshot::Sender<Result<String, JoinError>>,
    },
    Join {
        connection: Connection,
        game_id: Option<String>,
        response: oneshot::Sender<Result<String, JoinError>>,
    },
    Leave {
        player_id: String,
    },
    Update {
        player_id: String,
        x: f64,
        y: f64,
    },
    ListGames {
        response: oneshot::Sender<Vec<GameSummary>>,
    },
    /// The socket went away.
    Disconnect {
        player_id: String,
    },
}

/// Run the main game loop. Owns all game state.
pub async fn run_game_loop(mut cmd_rx: mpsc::Receiver<GameCommand>, server_config: ServerConfig) {
    let mut scheduler = Scheduler::new(server_config.game.clone(), server_config.rng_seed);

    let mut tick_interval = tokio::time::interval(scheduler.config().update_interval());
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut animation_interval = tokio::time::interval(scheduler.config().animation_interval());
    animation_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Both clocks only run while there is at least one session.
    let mut running = false;

    loop {
        if running == scheduler.is_empty() {
            running = !running;
            if running {
                tracing::info!("game loop starting");
                tick_interval.reset();
                animation_interval.reset();
            } else {
                tracing::info!("game loop idle");
            }
        }

        tokio::select! {
            _ = tick_interval.tick(), if running => {
                scheduler.tick(Instant::now());
            }

            _ = animation_interval.tick(), if running => {
                scheduler.animate(Instant::now());
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut scheduler, cmd, Instant::now()),
                    None => break,
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}

fn handle_command(scheduler: &mut Scheduler, cmd: GameCommand, now: Instant) {
    match cmd {
        GameCommand::Create {
            connection,
            name,
            max_players,
            public,
            response,
        } => {
            let result = scheduler.create_and_join(name, max_players, public, connection, now);
            let _ = response.send(result);
        }
        GameCommand::Join {
            connection,
            game_id,
            response,
        } => {
            let player_id = connection.id().to_string();
            let result = scheduler.join_session(game_id.as_deref(), connection, now);
            if let Err(e) = &result {
                tracing::info!(player = %player_id, "join rejected: {}", e);
            }
            let _ = response.send(result);
        }
        GameCommand::Leave { player_id } | GameCommand::Disconnect { player_id } => {
            scheduler.leave(&player_id, now);
        }
        GameCommand::Update { player_id, x, y } => {
            scheduler.update_player_position(&player_id, x, y, now);
        }
        GameCommand::ListGames { response } => {
            let _ = response.send(scheduler.list_public());
        }
    }
}
