//! Configuration for the trackway server.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Unknown fields are ignored and missing fields fall back to
//! their defaults, so older and newer files both load.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, GameConfig, LobbyConfig, NetworkConfig, default_config_dir};
pub use error::ConfigError;
