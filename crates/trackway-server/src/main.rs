//! TAOnline rail game server.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p trackway-server -- --port 4686 --seed 7`.
//! Operator commands (`LIST`, `KICK <name>`, `EXIT`) are read from stdin.

use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use trackway_config::{CliArgs, Config, default_config_dir};
use trackway_net::{GameServer, LineConfig, LobbyLimits, ServerConfig};

fn server_config(config: &Config) -> Result<ServerConfig, trackway_config::ConfigError> {
    Ok(ServerConfig {
        bind_addr: config.network.socket_addr()?,
        limits: LobbyLimits {
            max_players: config.lobby.max_players,
            min_players: config.lobby.min_players,
        },
        handshake_timeout: config.network.handshake_timeout(),
        line: LineConfig {
            max_line_length: config.network.max_line_length,
        },
        city_seed: config.game.city_seed,
    })
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    trackway_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let server_config = match server_config(&config) {
        Ok(server_config) => server_config,
        Err(err) => {
            tracing::error!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(server_config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Cannot listen on {}: {err}", server_config.bind_addr);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Listening on {} (max {} players)",
        server_config.bind_addr,
        server_config.limits.max_players
    );

    let server = GameServer::new(server_config);
    let console = BufReader::new(tokio::io::stdin());
    let (result, ()) = tokio::join!(server.run_with_listener(listener), server.run_console(console));

    if let Err(err) = result {
        tracing::error!("Server stopped with error: {err}");
        std::process::exit(1);
    }
    tracing::info!("Server stopped");
}
