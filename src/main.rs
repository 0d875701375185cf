//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: SQLite store, brokerage gateway, LINE client, webhook
//! - Application: Codec, Continuation, Router
//! - Interface: Command Handlers

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;
#[cfg(test)]
mod testkit;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::router::CommandRouter;
use crate::domain::config::AppConfig;
use crate::domain::traits::{Brokerage, UserStore};
use crate::domain::types::User;
use crate::infrastructure::brokerage::HttpBrokerage;
use crate::infrastructure::line::LineClient;
use crate::infrastructure::store::SqliteUserStore;
use crate::infrastructure::webhook::{self, WebhookState};

#[derive(Parser)]
#[command(name = "tradeline")]
#[command(about = "LINE bot front end for a stock brokerage account")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "data/config.yaml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the webhook server
    Run,

    /// Register a user or replace their brokerage credentials
    AddUser {
        /// LINE user id
        #[arg(long)]
        id: String,
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        secret_key: String,
        /// Path to the trading certificate
        #[arg(long)]
        ca_path: String,
        #[arg(long)]
        ca_passwd: String,
        /// National id the certificate was issued for
        #[arg(long)]
        person_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config_content =
        fs::read_to_string(&cli.config).with_context(|| format!("Failed to read {}", cli.config))?;
    let config: AppConfig =
        serde_yaml::from_str(&config_content).context("Failed to parse configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::AddUser {
            id,
            api_key,
            secret_key,
            ca_path,
            ca_passwd,
            person_id,
        } => add_user(
            &config,
            User {
                id,
                api_key,
                secret_key,
                ca_path,
                ca_passwd,
                person_id,
                pending_template: None,
            },
        ),
    }
}

async fn run(config: AppConfig) -> Result<()> {
    // 2. Logging Setup
    // Ensure data directory exists
    if !Path::new("data").exists() {
        fs::create_dir("data").context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"));

    // Layer for file (Always active)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting Tradeline...");

    // 3. Initialize Infrastructure
    let store: Arc<dyn UserStore> =
        Arc::new(SqliteUserStore::open(Path::new(&config.database.path))?);
    let brokerage: Arc<dyn Brokerage> = Arc::new(HttpBrokerage::new(&config.brokerage));
    let line = Arc::new(LineClient::new(&config.line.access_token));

    // The bot works without a rich menu, so a failure here only warns.
    match &config.line.rich_menu_image {
        Some(image) => match line.setup_rich_menu(Path::new(image)).await {
            Ok(()) => tracing::info!("Rich menu installed"),
            Err(err) => tracing::warn!("Rich menu setup failed: {:#}", err),
        },
        None => tracing::info!("No rich menu image configured, skipping menu setup"),
    }

    // 4. Initialize Application Components
    let router = Arc::new(CommandRouter::new(store, brokerage));
    let state = Arc::new(WebhookState {
        channel_secret: config.line.channel_secret.clone(),
        line,
        router,
    });

    // 5. Serve the webhook
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("Listening on {}", config.server.bind);
    axum::serve(listener, webhook::app(state)).await?;

    Ok(())
}

fn add_user(config: &AppConfig, user: User) -> Result<()> {
    let store = SqliteUserStore::open(Path::new(&config.database.path))?;
    store.upsert_user(&user)?;
    println!("User {} saved", user.id);
    Ok(())
}
