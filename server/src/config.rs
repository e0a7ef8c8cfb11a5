use clap::Parser;
use npong_shared::config::GameConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command line flags, each with an environment fallback.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "N-player pong game server")]
pub struct Cli {
    /// Address to bind to; the port comes from --port when given
    #[arg(long, env = "NPONG_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Port to listen on, overriding the one in --listen
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory with the browser client
    #[arg(long, env = "NPONG_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Seed for session ids and ball serves (random when omitted)
    #[arg(long, env = "NPONG_SEED")]
    pub seed: Option<u64>,

    /// Upper bound on players per game
    #[arg(long, env = "NPONG_MAX_PLAYERS")]
    pub max_players: Option<usize>,

    /// Kick players silent for this many seconds
    #[arg(long, env = "NPONG_IDLE_KICK_SECS")]
    pub idle_kick_secs: Option<u64>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub static_dir: PathBuf,
    pub rng_seed: Option<u64>,
    /// Outbound queue capacity per player; a client this far behind drops snapshots
    pub player_buffer: usize,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("public"),
            rng_seed: None,
            player_buffer: 64,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, String> {
        let mut config = Self {
            listen_addr: cli.listen,
            static_dir: cli.static_dir,
            rng_seed: cli.seed,
            ..Self::default()
        };
        if let Some(port) = cli.port {
            let mut addr: SocketAddr = config
                .listen_addr
                .parse()
                .map_err(|e| format!("invalid listen address {}: {}", config.listen_addr, e))?;
            addr.set_port(port);
            config.listen_addr = addr.to_string();
        }
        if let Some(max_players) = cli.max_players {
            config.game.max_players = max_players;
        }
        if let Some(secs) = cli.idle_kick_secs {
            config.game.idle_kick_after_ms = Some(secs.saturating_mul(1000));
        }
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid listen address {}: {}", self.listen_addr, e))?;
        if self.player_buffer == 0 {
            return Err("player_buffer must be > 0".to_string());
        }
        self.game.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("npong-server").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn port_overrides_listen_port() {
        let config =
            ServerConfig::from_cli(parse(&["--listen", "127.0.0.1:9000", "--port", "9100"]))
                .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9100");
    }

    #[test]
    fn game_flags_reach_game_config() {
        let config = ServerConfig::from_cli(parse(&[
            "--max-players",
            "4",
            "--idle-kick-secs",
            "30",
            "--seed",
            "99",
        ]))
        .unwrap();
        assert_eq!(config.game.max_players, 4);
        assert_eq!(config.game.idle_kick_after_ms, Some(30_000));
        assert_eq!(config.rng_seed, Some(99));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_listen_address_rejected() {
        let config = ServerConfig {
            listen_addr: "not an address".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ServerConfig::from_cli(parse(&["--listen", "nope", "--port", "1"])).is_err());
    }

    #[test]
    fn zero_players_rejected() {
        let config = ServerConfig::from_cli(parse(&["--max-players", "0"])).unwrap();
        assert!(config.validate().is_err());
    }
}
