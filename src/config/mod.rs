//! Configuration module for the game server.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared room key gating the API (open when unset)
    pub room_key: Option<String>,
    /// Path to SQLite database file backing the state store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Capacity of the store change broadcast channel
    pub event_buffer: usize,
    /// Maximum accepted request body, drawings included
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let room_key = env::var("POC_ROOM_KEY").ok().filter(|k| !k.is_empty());

        let db_path = env::var("POC_DB_PATH")
            .unwrap_or_else(|_| "./data/game.sqlite".to_string())
            .into();

        let bind_addr = parse_var("POC_BIND_ADDR", "127.0.0.1:8080")?;
        let log_level = env::var("POC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let event_buffer = parse_var("POC_EVENT_BUFFER", "256")?;
        let max_body_bytes = parse_var("POC_MAX_BODY_BYTES", "4194304")?;

        if event_buffer == 0 {
            return Err("POC_EVENT_BUFFER must be greater than zero".to_string());
        }

        Ok(Self {
            room_key,
            db_path,
            bind_addr,
            log_level,
            event_buffer,
            max_body_bytes,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| format!("Invalid {} value: {:?}", name, raw))
}
