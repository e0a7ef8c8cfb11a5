use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::connection::{Connection, Outbound};
use crate::game_loop::GameCommand;
use npong_shared::protocol::{ClientMsg, ErrorMsg, GameListMsg, ServerMsg};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    /// Outbound queue capacity for each player
    pub player_buffer: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let player_id = uuid::Uuid::new_v4().to_string();
    let (connection, mut outbound_rx) =
        Connection::channel(player_id.clone(), app_state.player_buffer);
    tracing::info!(player = %player_id, "client connected");

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                tracing::debug!(player = %player_id, "unparseable message: {}", e);
                                continue;
                            }
                        };
                        if let Some(reply) = handle_client_msg(&app_state, &connection, client_msg).await {
                            if send_json(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (this player's queue)
            frame = outbound_rx.recv() => {
                match frame {
                    Some(Outbound::Message(msg)) => {
                        if send_json(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::Disconnect {
            player_id: player_id.clone(),
        })
        .await;
    tracing::info!(player = %player_id, "client disconnected");
}

async fn send_json(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("failed to serialize server message: {}", e);
            Ok(())
        }
    }
}

fn error_msg(reason: impl ToString) -> ServerMsg {
    ServerMsg::Error(ErrorMsg {
        reason: reason.to_string(),
    })
}

/// Forward a client message to the game loop. Returns a reply for the client, if any.
async fn handle_client_msg(
    app_state: &AppState,
    connection: &Connection,
    msg: ClientMsg,
) -> Option<ServerMsg> {
    let player_id = connection.id().to_string();
    match msg {
        ClientMsg::Create {
            name,
            max_players,
            public,
        } => {
            let (response, rx) = oneshot::channel();
            let cmd = GameCommand::Create {
                connection: connection.clone(),
                name,
                max_players: max_players.map(|n| n as usize),
                public,
                response,
            };
            await_join(app_state, cmd, rx, &player_id).await
        }
        ClientMsg::Join { id } => {
            let (response, rx) = oneshot::channel();
            let cmd = GameCommand::Join {
                connection: connection.clone(),
                game_id: id,
                response,
            };
            await_join(app_state, cmd, rx, &player_id).await
        }
        ClientMsg::Leave => {
            let _ = app_state.game_tx.send(GameCommand::Leave { player_id }).await;
            None
        }
        ClientMsg::Update { x, y } => {
            let _ = app_state
                .game_tx
                .send(GameCommand::Update { player_id, x, y })
                .await;
            None
        }
        ClientMsg::ListGames => {
            let (response, rx) = oneshot::channel();
            if app_state
                .game_tx
                .send(GameCommand::ListGames { response })
                .await
                .is_err()
            {
                tracing::error!("Failed to send ListGames command");
                return Some(error_msg("server unavailable"));
            }
            match rx.await {
                Ok(games) => Some(ServerMsg::GameList(GameListMsg { games })),
                Err(_) => Some(error_msg("server unavailable")),
            }
        }
    }
}

async fn await_join(
    app_state: &AppState,
    cmd: GameCommand,
    rx: oneshot::Receiver<Result<String, crate::scheduler::JoinError>>,
    player_id: &str,
) -> Option<ServerMsg> {
    if app_state.game_tx.send(cmd).await.is_err() {
        tracing::error!(player = %player_id, "game loop is gone");
        return Some(error_msg("server unavailable"));
    }
    match rx.await {
        Ok(Ok(game_id)) => {
            tracing::info!(player = %player_id, session = %game_id, "client entered game");
            None
        }
        Ok(Err(e)) => Some(error_msg(e)),
        Err(_) => Some(error_msg("server unavailable")),
    }
}
