//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// trackway server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "trackway-server", about = "TAOnline rail game server")]
pub struct CliArgs {
    /// TCP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind the listener to.
    #[arg(long)]
    pub bind: Option<String>,

    /// Maximum connected players.
    #[arg(long)]
    pub max_players: Option<usize>,

    /// Fixed seed for city dealing.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(ref bind) = args.bind {
            self.network.bind_address = bind.clone();
        }
        if let Some(max) = args.max_players {
            self.lobby.max_players = max;
        }
        if let Some(seed) = args.seed {
            self.game.city_seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            port: Some(5000),
            seed: Some(11),
            bind: Some("127.0.0.1".to_string()),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.network.port, 5000);
        assert_eq!(config.network.bind_address, "127.0.0.1");
        assert_eq!(config.game.city_seed, Some(11));
        // Non-overridden fields retain defaults
        assert_eq!(config.lobby.max_players, 6);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "trackway-server",
            "--port",
            "4700",
            "--max-players",
            "3",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.port, Some(4700));
        assert_eq!(args.max_players, Some(3));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }
}
