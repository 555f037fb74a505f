//! TOML configuration for the gateway and directory backend.
//!
//! Every field has a default so a missing file (or an empty one) yields a
//! runnable local setup. Supabase credentials are normally supplied via
//! `SUPABASE_URL` / `SUPABASE_SERVICE_KEY` rather than the file; the
//! environment always wins so keys stay out of committed config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "passgate.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Login attempts allowed per client IP per minute (0 = unlimited).
    pub login_rate_limit_per_minute: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            login_rate_limit_per_minute: 30,
        }
    }
}

/// Which directory implementation serves user lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// Supabase PostgREST, the production path.
    Supabase,
    /// Users declared inline in the config file.
    #[default]
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub backend: DirectoryBackend,
    pub supabase: SupabaseSettings,
    /// User rows for the memory backend.
    pub users: Vec<StaticUserEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_key: String,
    pub users_table: String,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            users_table: "users".into(),
        }
    }
}

/// One inline user row for the memory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticUserEntry {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    /// bcrypt or legacy SHA-256 hex; generate with `passgate hash-password`.
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl Config {
    /// Load from an explicit path (error if unreadable), or from
    /// `passgate.toml` when present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
