//! CLI interface for ngxdash

pub mod commands;
mod output;

pub use output::*;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ngxdash")]
#[command(author = "Krakaw")]
#[command(version)]
#[command(about = "Inspect and manage a native or containerized NGINX", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default ngxdash.toml into the current directory
    Init,

    /// Show whether NGINX runs natively or inside a container
    Env {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List configured sites
    Sites {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Enable a site by linking it into sites-enabled
    Enable {
        /// File name in sites-available
        name: String,
    },

    /// Disable a site by removing its sites-enabled link
    Disable {
        /// File name in sites-enabled
        name: String,
    },

    /// Validate the NGINX configuration
    Test,

    /// Reload NGINX
    Reload,

    /// Install a new site, test the configuration and reload
    Create(CreateArgs),

    /// Show recent access log entries
    Logs {
        /// Number of lines to show from the end
        #[arg(short, long, default_value = "50")]
        tail: usize,

        /// Show the error log instead
        #[arg(short, long)]
        errors: bool,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Summarize the last 1000 access log entries
    Stats {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Sample NGINX resource usage
    Metrics {
        /// Number of samples to take
        #[arg(short, long, default_value = "1")]
        samples: usize,

        /// Seconds between samples (defaults to metrics.interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show host load, memory and disk usage
    System {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// File name for the new site (derived from the server name when omitted)
    pub filename: Option<String>,

    /// Use an existing configuration file as is
    #[arg(long, conflicts_with_all = ["spec", "preset"])]
    pub file: Option<PathBuf>,

    /// Render the site from a TOML site description
    #[arg(long, conflicts_with = "preset")]
    pub spec: Option<PathBuf>,

    /// Render one of the built-in presets (static, spa, proxy, php)
    #[arg(long, requires = "server_name")]
    pub preset: Option<String>,

    /// Server name for --preset
    #[arg(long)]
    pub server_name: Option<String>,

    /// Print the configuration instead of installing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
