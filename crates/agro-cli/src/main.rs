use agro_cli::{load_config, BmpCommands, Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let level = match cli.log_level {
        Some(level) => level,
        None => config.log_level()?,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Goal { .. } => commands::goal::handle(&cli.command, &config),
        Commands::Bmp { command } => match command {
            BmpCommands::Sweep { .. } => commands::bmp::sweep(command, &config),
            BmpCommands::Price { .. } => commands::bmp::price(command, &config),
        },
        Commands::Solvers => commands::solvers::handle(),
    }
}
