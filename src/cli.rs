use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "sftp-alert")]
#[command(about = "Emails an alert when files sit in a remote SFTP folder longer than allowed")]
pub struct Cli {
    /// TOML configuration file (otherwise settings come from the environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the folder once and alert on newly stale files
    Check {
        /// List and report only; send nothing and record nothing
        #[arg(long)]
        dry_run: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check the folder repeatedly, one run at a time
    Watch {
        /// Minutes between runs
        #[arg(short, long, default_value = "15")]
        interval_minutes: u64,
        /// List and report only; send nothing and record nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the names already alerted on
    Alerted {
        /// Store file to read (defaults to the configured one)
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
