use std::env;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

/// Store credentials as supplied by the environment: either an inline JSON
/// blob or a path to a JSON file with the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreCredentials {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreCredentials,
    pub session_secret: String,
    /// Optional JSON identity table; the built-in table is used otherwise.
    pub directory_file: Option<PathBuf>,
    /// Optional flat roster file bulk-imported at startup.
    pub roster_csv: Option<PathBuf>,
}

impl Config {
    pub fn load() -> anyhow::Result<Config> {
        Ok(Config {
            port: parse_or_default("ROLLCALL_PORT", 8080)?,
            store: load_store_credentials()?,
            session_secret: load_session_secret(),
            directory_file: env::var("ROLLCALL_DIRECTORY").ok().map(PathBuf::from),
            roster_csv: env::var("ROLLCALL_ROSTER_CSV").ok().map(PathBuf::from),
        })
    }
}

fn parse_or_default(key: &str, default: u16) -> anyhow::Result<u16> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{} must be a port number, got {:?}", key, v)),
        Err(_) => {
            info!("{} not set, using default {}", key, default);
            Ok(default)
        }
    }
}

fn load_store_credentials() -> anyhow::Result<StoreCredentials> {
    let raw = match env::var("ROLLCALL_STORE") {
        Ok(v) => v,
        Err(_) => {
            info!("ROLLCALL_STORE not set, using ./data");
            return Ok(StoreCredentials {
                path: PathBuf::from("data"),
            });
        }
    };
    let blob = if raw.trim_start().starts_with('{') {
        raw
    } else {
        std::fs::read_to_string(&raw)
            .with_context(|| format!("failed to read store credentials file {}", raw))?
    };
    serde_json::from_str(&blob).context("store credentials are invalid JSON")
}

fn load_session_secret() -> String {
    match env::var("ROLLCALL_SESSION_SECRET") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            warn!("ROLLCALL_SESSION_SECRET not set, using an insecure development secret");
            "rollcall-dev-secret".to_string()
        }
    }
}
