//! Jellarr - declarative Jellyfin configuration
//!
//! Usage:
//!   jellarr                               # Apply config/config.yml
//!   jellarr apply --config-file my.yml    # Apply a specific document
//!   jellarr dump --base-url http://...    # Print current server state as YAML
//!
//! The API key is read from `JELLARR_API_KEY`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use jellarr_core::config::{API_KEY_ENV, DEFAULT_CONFIG_PATH, load_config, to_yaml};
use jellarr_core::dump::dump_config;
use jellarr_core::prelude::{JellyfinClient, Reconciler};

#[derive(Parser)]
#[command(name = "jellarr")]
#[command(about = "Declarative Jellyfin configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the server with a desired-state document (default)
    Apply {
        /// Path to the YAML document
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config_file: PathBuf,
    },

    /// Print the server's current configuration as a YAML document
    Dump {
        /// Server to read from
        #[arg(long)]
        base_url: Url,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jellarr=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => run_apply(Path::new(DEFAULT_CONFIG_PATH)).await,
        Some(Commands::Apply { config_file }) => run_apply(&config_file).await,
        Some(Commands::Dump { base_url }) => run_dump(&base_url).await,
    };

    if let Err(err) = result {
        eprintln!("❌ jellarr failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run_apply(config_file: &Path) -> Result<()> {
    let config = load_config(config_file)?;
    tracing::info!("Applying {} to {}", config_file.display(), config.base_url);
    let client = JellyfinClient::new(&config.base_url()?, &api_key()?)?;

    let report = Reconciler::new(&client).run(&config).await?;

    for name in &report.skipped_folders {
        eprintln!("⚠️  Virtual folder '{name}' left unchanged: path updates are not supported");
    }
    if report.changed() {
        println!("✅ jellarr apply complete");
    } else {
        println!("✅ jellarr apply complete: server already matches {}", config_file.display());
    }
    Ok(())
}

async fn run_dump(base_url: &Url) -> Result<()> {
    let client = JellyfinClient::new(base_url, &api_key()?)?;

    let config = dump_config(&client, base_url.as_str()).await?;

    eprintln!("Note: user passwords cannot be exported; add password or passwordFile before applying.");
    print!("{}", to_yaml(&config)?);
    Ok(())
}

fn api_key() -> Result<String> {
    std::env::var(API_KEY_ENV).with_context(|| format!("{API_KEY_ENV} environment variable is required"))
}
