pub mod cli;
pub mod config;

pub use cli::{BmpCommands, Cli, Commands, ResultFormat};
pub use config::{load_config, AgroConfig, CONFIG_FILE};
