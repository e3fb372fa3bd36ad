mod change_watcher;
mod config;
mod logging;
mod play_log;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    logging::setup_logging,
    services::orchestrator::{CycleOutcome, Orchestrator},
    services::spotify::client::{SpotifyApiCredentials, SpotifyHttpAdapter},
    services::spotify::token_cache::TokenCache,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "NOWPLAYING_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level
    #[arg(long, default_value = "info", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file, rotated daily (default: ./runtime.log)
    #[arg(long, env = "NOWPLAYING_SYNC_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the now playing log and keep the playlist in sync (default)
    Run,
    /// Run a single sync cycle now, whether or not the log changed
    Sync,
    /// Log in to Spotify and cache the token
    Auth,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        Config::from_file(&path)
    } else {
        Config::load()
    }
    .wrap_err("Failed to load nowplaying-sync config")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_retention = setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::info!("nowplaying-sync starting");

    match args.command.unwrap_or(Commands::Run) {
        Commands::Config(ConfigCommands::CreateDefault) => {
            let path = Config::create_default()?;
            println!("{}", path.display());
        }
        Commands::Config(ConfigCommands::Path) => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
        Commands::Auth => {
            let config = load_config(args.config)?;
            let adapter = SpotifyHttpAdapter::authorize(
                SpotifyApiCredentials::from_config(config.spotify()),
                TokenCache::new(config.token_cache_path()),
            )
            .await?;
            let user = adapter.current_user().await?;
            log::info!(
                "Authenticated as {} ({})",
                user.display_name.as_deref().unwrap_or("no display name"),
                user.id
            );
            if user.id != config.spotify().username {
                log::warn!(
                    "Authenticated user {} differs from configured username {}",
                    user.id,
                    config.spotify().username
                );
            }
        }
        Commands::Sync => {
            let config = load_config(args.config)?;
            let adapter = connect(&config).await?;
            let mut orchestrator = Orchestrator::new(&config, &adapter);
            match orchestrator.run_cycle().await {
                CycleOutcome::Skipped => log::warn!("Sync skipped, play log unreadable"),
                CycleOutcome::Completed(report) => log::info!(
                    "Sync finished: {} records, {} matched, {} inserted",
                    report.records,
                    report.matched,
                    report.reconcile.inserted
                ),
            }
        }
        Commands::Run => {
            let config = load_config(args.config)?;
            let adapter = connect(&config).await?;
            Orchestrator::new(&config, &adapter)
                .with_log_retention(log_retention)
                .run()
                .await?;
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<SpotifyHttpAdapter> {
    SpotifyHttpAdapter::connect(
        SpotifyApiCredentials::from_config(config.spotify()),
        TokenCache::new(config.token_cache_path()),
    )
    .await
    .wrap_err("Failed to connect to Spotify")
}
