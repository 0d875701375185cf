//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the LINE channel, webhook server, brokerage gateway and database.

use serde::Deserialize;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub line: LineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub brokerage: BrokerageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// LINE Messaging API credentials and rich menu assets.
#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    pub channel_secret: String,
    pub access_token: String,
    /// PNG uploaded as the rich menu background; menu setup is skipped when unset.
    #[serde(default)]
    pub rich_menu_image: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8064".to_string()
}

/// Trading gateway endpoint settings.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerageConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "data/db.sqlite3".to_string()
}
