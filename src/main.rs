use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use sftp_alert::cli::{Cli, Commands, OutputFormat};
use sftp_alert::config::{defaults, env_vars};
use sftp_alert::store::LineFileStore;
use sftp_alert::{AlertPlatform, Config};

/// Exit status when the alert could not be delivered
const EXIT_MAIL_FAILED: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment first so RUST_LOG from the .env file takes effect.
    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("loading environment from {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    env_logger::init();

    match cli.command {
        Commands::Check { dry_run, format } => {
            let config = load_config(cli.config.as_ref())?;
            let platform = AlertPlatform::new(&config);
            let report = platform.run(dry_run).await.with_context(|| {
                format!("checking {} on {}", config.sftp.folder, config.sftp.host)
            })?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => println!("{}", report),
            }

            if report.is_failure() {
                std::process::exit(EXIT_MAIL_FAILED);
            }
        }
        Commands::Watch { interval_minutes, dry_run } => {
            if interval_minutes == 0 {
                eprintln!("Error: Interval must be greater than 0");
                std::process::exit(1);
            }
            let config = load_config(cli.config.as_ref())?;
            watch(&config, Duration::from_secs(interval_minutes * 60), dry_run).await;
        }
        Commands::Alerted { store } => {
            let path = match store {
                Some(path) => path,
                None => store_path(cli.config.as_ref())?,
            };
            let store = LineFileStore::new(&path);
            for name in store.entries()? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env()?,
    };
    log::debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

// The store path alone does not need the SFTP and SMTP settings.
fn store_path(config_file: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = config_file {
        return Ok(Config::from_toml_file(path)?.alert.store_path);
    }
    Ok(std::env::var(env_vars::ALERTED_FILES_PATH)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(defaults::ALERTED_FILES_PATH)))
}

/// Runs checks on a fixed interval until Ctrl-C.
async fn watch(config: &Config, every: Duration, dry_run: bool) {
    let platform = AlertPlatform::new(config);

    log::info!(
        "Watching {} on {} every {}s",
        config.sftp.folder,
        config.sftp.host,
        every.as_secs()
    );

    // One handler for the whole loop so an interrupt during a run is not lost.
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C, watch will run until killed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    platform.watch(every, dry_run, interrupted).await;
}
