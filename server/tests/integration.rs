//! Integration tests for the n-pong server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// Re-create minimal protocol types for testing, so the wire shape is checked independently
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[allow(dead_code)]
enum ServerMsg {
    #[serde(rename = "info")]
    Info {
        #[serde(rename = "protocolVersion")]
        protocol_version: u32,
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "canvasWidth")]
        canvas_width: f64,
        #[serde(rename = "ballRadius")]
        ball_radius: f64,
    },
    #[serde(rename = "update")]
    Update {
        pp: Vec<serde_json::Value>,
        b: Vec<serde_json::Value>,
        p: Option<Vec<serde_json::Value>>,
        me: u32,
        e: u32,
    },
    #[serde(rename = "game_list")]
    GameList { games: Vec<serde_json::Value> },
    #[serde(rename = "error")]
    Error { reason: String },
    #[serde(rename = "kick")]
    Kick,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ClientMsg {
    #[serde(rename = "create")]
    Create {
        name: Option<String>,
        #[serde(rename = "maxPlayers")]
        max_players: Option<u32>,
        public: bool,
    },
    #[serde(rename = "join")]
    Join { id: Option<String> },
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "update")]
    Update { x: f64, y: f64 },
    #[serde(rename = "list_games")]
    ListGames,
}

/// Start a test server on a random available port and return the WebSocket URL.
async fn start_test_server() -> String {
    use npong_server::config::ServerConfig;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        static_dir: PathBuf::from("public"),
        rng_seed: Some(12345),
        ..ServerConfig::default()
    };
    let app = npong_server::build_app(config);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut WsStream, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Read the next text message and parse as ServerMsg. `None` once the socket closes.
async fn recv_msg(ws: &mut WsStream) -> Option<ServerMsg> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(&text).expect("Failed to parse server message"));
            }
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
        }
    }
}

/// Skip messages until one matches, failing after a timeout.
async fn recv_until<T>(ws: &mut WsStream, mut pick: impl FnMut(ServerMsg) -> Option<T>) -> T {
    let wait = async {
        loop {
            match recv_msg(ws).await {
                Some(msg) => {
                    if let Some(found) = pick(msg) {
                        return found;
                    }
                }
                None => panic!("WebSocket closed unexpectedly"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("Timed out waiting for message")
}

async fn create_game(ws: &mut WsStream, name: &str, public: bool) -> String {
    send(
        ws,
        &ClientMsg::Create {
            name: Some(name.to_string()),
            max_players: None,
            public,
        },
    )
    .await;
    recv_until(ws, |msg| match msg {
        ServerMsg::Info { game_id, .. } => Some(game_id),
        _ => None,
    })
    .await
}

async fn list_games(ws: &mut WsStream) -> Vec<serde_json::Value> {
    send(ws, &ClientMsg::ListGames).await;
    recv_until(ws, |msg| match msg {
        ServerMsg::GameList { games } => Some(games),
        _ => None,
    })
    .await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_create_sends_info_then_updates() {
    let url = start_test_server().await;
    let mut ws = connect(&url).await;

    send(
        &mut ws,
        &ClientMsg::Create {
            name: None,
            max_players: None,
            public: false,
        },
    )
    .await;
    match recv_msg(&mut ws).await {
        Some(ServerMsg::Info {
            protocol_version,
            game_id,
            canvas_width,
            ball_radius,
        }) => {
            assert_eq!(protocol_version, 1);
            assert_eq!(game_id.len(), 5);
            assert_eq!(canvas_width, 700.0);
            assert_eq!(ball_radius, 5.0);
        }
        other => panic!("Expected Info, got {:?}", other),
    }

    let (pp, b, me) = recv_until(&mut ws, |msg| match msg {
        ServerMsg::Update { pp, b, me, .. } => Some((pp, b, me)),
        _ => None,
    })
    .await;
    assert_eq!(pp.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(me, 0);
}

#[tokio::test]
async fn test_second_player_joins_by_id() {
    let url = start_test_server().await;
    let mut ws1 = connect(&url).await;
    let mut ws2 = connect(&url).await;

    let game_id = create_game(&mut ws1, "duel", false).await;
    send(
        &mut ws2,
        &ClientMsg::Join {
            id: Some(game_id.clone()),
        },
    )
    .await;
    let joined = recv_until(&mut ws2, |msg| match msg {
        ServerMsg::Info { game_id, .. } => Some(game_id),
        _ => None,
    })
    .await;
    assert_eq!(joined, game_id);

    let (pp, p, me, e) = recv_until(&mut ws2, |msg| match msg {
        ServerMsg::Update { pp, p, me, e, .. } => Some((pp, p, me, e)),
        _ => None,
    })
    .await;
    assert_eq!(pp.len(), 2);
    assert_eq!(me, 1);
    assert_eq!(e, 2);
    // the court is still being drawn
    assert_eq!(p.map(|p| p.len()), Some(4));
}

#[tokio::test]
async fn test_join_without_games_reports_error() {
    let url = start_test_server().await;
    let mut ws = connect(&url).await;

    send(&mut ws, &ClientMsg::Join { id: None }).await;
    match recv_msg(&mut ws).await {
        Some(ServerMsg::Error { reason }) => assert!(!reason.is_empty()),
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_games_shows_public_games_only() {
    let url = start_test_server().await;
    let mut host = connect(&url).await;
    let mut hidden = connect(&url).await;
    let mut browser = connect(&url).await;

    let public_id = create_game(&mut host, "lobby", true).await;
    create_game(&mut hidden, "secret", false).await;

    let games = list_games(&mut browser).await;
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["id"], public_id.as_str());
    assert_eq!(games[0]["name"], "lobby");
    assert_eq!(games[0]["numPlayers"], 1);
    assert_eq!(games[0]["maxPlayers"], 10);
}

#[tokio::test]
async fn test_leave_closes_socket_and_removes_game() {
    let url = start_test_server().await;
    let mut ws = connect(&url).await;
    let mut browser = connect(&url).await;

    create_game(&mut ws, "short", true).await;
    assert_eq!(list_games(&mut browser).await.len(), 1);

    send(&mut ws, &ClientMsg::Leave).await;
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while recv_msg(&mut ws).await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "socket should close after leaving");

    assert!(list_games(&mut browser).await.is_empty());
}

#[tokio::test]
async fn test_disconnect_removes_player() {
    let url = start_test_server().await;
    let mut ws1 = connect(&url).await;
    let mut ws2 = connect(&url).await;

    let game_id = create_game(&mut ws1, "duel", true).await;
    send(&mut ws2, &ClientMsg::Join { id: Some(game_id) }).await;
    recv_until(&mut ws1, |msg| match msg {
        ServerMsg::Update { pp, .. } if pp.len() == 2 => Some(()),
        _ => None,
    })
    .await;

    drop(ws2);
    recv_until(&mut ws1, |msg| match msg {
        ServerMsg::Update { pp, b, .. } if pp.len() == 1 => {
            assert_eq!(b.len(), 1);
            Some(())
        }
        _ => None,
    })
    .await;
}

#[tokio::test]
async fn test_bad_input_is_ignored() {
    let url = start_test_server().await;
    let mut ws = connect(&url).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    // a position update outside any game
    send(&mut ws, &ClientMsg::Update { x: 1.0, y: 2.0 }).await;

    assert!(list_games(&mut ws).await.is_empty());
}
