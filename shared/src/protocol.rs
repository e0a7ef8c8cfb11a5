use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "info")]
    Info(InfoMsg),
    #[serde(rename = "update")]
    Update(UpdateMsg),
    #[serde(rename = "game_list")]
    GameList(GameListMsg),
    #[serde(rename = "error")]
    Error(ErrorMsg),
    #[serde(rename = "kick")]
    Kick,
}

/// Sent once to a player when they enter a game.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
#[serde(rename_all = "camelCase")]
pub struct InfoMsg {
    pub protocol_version: u32,
    pub game_id: String,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub paddle_thickness: f64,
    pub paddle_length: f64,
    pub paddle_game_board_padding: f64,
    pub ball_radius: f64,
}

/// Per-tick snapshot, personalised with the receiver's index and edge.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
pub struct UpdateMsg {
    /// Paddles, in roster order
    pub pp: Vec<PaddleWire>,
    /// Ball positions
    pub b: Vec<PointWire>,
    /// Board vertices, only while the board is changing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub p: Option<Vec<PointWire>>,
    pub me: u32,
    pub e: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
pub struct PaddleWire {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    /// Score of the paddle's owner
    pub s: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
pub struct PointWire {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
pub struct GameListMsg {
    pub games: Vec<GameSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    pub name: String,
    pub num_players: u32,
    pub max_players: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
pub struct ErrorMsg {
    pub reason: String,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../public/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "create")]
    Create {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "maxPlayers")]
        max_players: Option<u32>,
        #[serde(default)]
        public: bool,
    },
    #[serde(rename = "join")]
    Join {
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "update")]
    Update { x: f64, y: f64 },
    #[serde(rename = "list_games")]
    ListGames,
}

// === Conversion helpers ===

/// Round to 2 decimal places (sub-pixel precision is plenty, keeps snapshots small)
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_omits_board_when_unchanged() {
        let msg = ServerMsg::Update(UpdateMsg {
            pp: vec![PaddleWire {
                x: 20.0,
                y: 349.0,
                t: 1.57,
                s: -200,
            }],
            b: vec![PointWire { x: 349.0, y: 349.0 }],
            p: None,
            me: 0,
            e: 2,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"update\""));
        assert!(!json.contains("\"p\""));
        assert!(json.contains("\"me\":0"));
        assert!(json.contains("\"e\":2"));
        assert!(json.contains("\"s\":-200"));
    }

    #[test]
    fn update_includes_board_when_present() {
        let msg = ServerMsg::Update(UpdateMsg {
            pp: vec![],
            b: vec![],
            p: Some(vec![PointWire { x: 1.0, y: 2.0 }]),
            me: 1,
            e: 1,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"p\":[{\"x\":1.0,\"y\":2.0}]"));
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::Update(u) => assert_eq!(u.p.map(|p| p.len()), Some(1)),
            _ => panic!("Expected Update"),
        }
    }

    #[test]
    fn info_uses_camel_case() {
        let msg = ServerMsg::Info(InfoMsg {
            protocol_version: PROTOCOL_VERSION,
            game_id: "a1B2c".to_string(),
            canvas_width: 700.0,
            canvas_height: 700.0,
            paddle_thickness: 10.0,
            paddle_length: 50.0,
            paddle_game_board_padding: 20.0,
            ball_radius: 5.0,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"info\""));
        assert!(json.contains("\"gameId\":\"a1B2c\""));
        assert!(json.contains("\"paddleGameBoardPadding\":20.0"));
    }

    #[test]
    fn kick_is_bare_tag() {
        let json = serde_json::to_string(&ServerMsg::Kick).unwrap();
        assert_eq!(json, "{\"type\":\"kick\"}");
    }

    #[test]
    fn client_create_defaults() {
        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"create"}"#).unwrap();
        match parsed {
            ClientMsg::Create {
                name,
                max_players,
                public,
            } => {
                assert!(name.is_none());
                assert!(max_players.is_none());
                assert!(!public);
            }
            _ => panic!("Expected Create"),
        }
    }

    #[test]
    fn client_join_with_and_without_id() {
        match serde_json::from_str::<ClientMsg>(r#"{"type":"join","id":"xY9zQ"}"#).unwrap() {
            ClientMsg::Join { id } => assert_eq!(id.as_deref(), Some("xY9zQ")),
            _ => panic!("Expected Join"),
        }
        match serde_json::from_str::<ClientMsg>(r#"{"type":"join"}"#).unwrap() {
            ClientMsg::Join { id } => assert!(id.is_none()),
            _ => panic!("Expected Join"),
        }
    }

    #[test]
    fn client_update_parses_coordinates() {
        match serde_json::from_str::<ClientMsg>(r#"{"type":"update","x":12.5,"y":-3}"#).unwrap() {
            ClientMsg::Update { x, y } => {
                assert!((x - 12.5).abs() < 1e-9);
                assert!((y + 3.0).abs() < 1e-9);
            }
            _ => panic!("Expected Update"),
        }
    }

    #[test]
    fn unknown_client_type_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"ball_escaped"}"#).is_err());
    }

    #[test]
    fn round2_trims_precision() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(-0.005001), -0.01);
    }
}
