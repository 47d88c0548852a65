//! Runtime configuration: optional TOML file plus `SN_*` environment overrides.
//!
//! ```toml
//! log_level = "debug"
//!
//! [server]
//! port = 3001
//! cors_origin = "http://localhost:3000"
//!
//! [auth]
//! jwt_secret = "change-me"
//!
//! [[users]]
//! id = "u1"
//! role = "ANALYST"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared_types::Role;
use sn_01_broadcast_hub::HubConfig;
use std::path::{Path, PathBuf};

/// Path of the optional TOML file.
pub const CONFIG_PATH_VAR: &str = "SN_CONFIG";

/// Everything the runtime needs to start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Hub sections (`server`, `websocket`, `auth`, `feeds`, `stats_interval`)
    #[serde(flatten)]
    pub hub: HubConfig,
    /// Seed entries for the in-memory user directory
    pub users: Vec<UserEntry>,
    /// File the values were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            hub: HubConfig::default(),
            users: Vec::new(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RuntimeConfig {
    /// Load from `SN_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::load`] with an explicit variable lookup.
    pub fn load_with<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match env(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(&env)?;
        config
            .hub
            .validate()
            .context("invalid hub configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `SN_*` overrides on top of the file values.
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = env("SN_JWT_SECRET") {
            self.hub.auth.jwt_secret = secret;
        }
        if let Some(port) = env("SN_PORT") {
            self.hub.server.port = port
                .parse()
                .with_context(|| format!("SN_PORT is not a valid port: {port}"))?;
        }
        if let Some(host) = env("SN_HOST") {
            self.hub.server.host = host
                .parse()
                .with_context(|| format!("SN_HOST is not an IP address: {host}"))?;
        }
        if let Some(origin) = env("SN_CORS_ORIGIN") {
            self.hub.server.cors_origin = origin;
        }
        if let Some(level) = env("SN_LOG_LEVEL") {
            if level.trim().is_empty() {
                bail!("SN_LOG_LEVEL cannot be empty");
            }
            self.log_level = level;
        }
        Ok(())
    }
}
