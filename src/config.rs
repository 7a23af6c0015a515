//! Configuration Management
//!
//! Controller address, credentials and polling parameters. Loaded from
//! `<config dir>/netctrl/config.{json,yaml}` with environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller address; a bare host or a full URL with scheme
    pub controller_ip: String,
    pub username: String,
    /// Never written back to disk
    #[serde(skip_serializing)]
    pub password: String,
    /// Seconds between task status polls
    pub poll_interval_secs: u64,
    /// Polls before a background job is abandoned
    pub max_polls: u32,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Directory receiving ZTP artifacts
    pub artifact_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            controller_ip: String::new(),
            username: String::new(),
            password: String::new(),
            poll_interval_secs: 10,
            max_polls: 180,
            request_timeout_secs: 60,
            artifact_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Get the config directory
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("netctrl"))
    }

    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Self {
        let from_disk = Self::config_dir().and_then(|dir| {
            ["config.json", "config.yaml", "config.yml"]
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.exists())
        });

        let mut config = match from_disk {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            }),
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from an explicit JSON or YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")
        }
    }

    /// Apply `NETCTRL_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NETCTRL_CONTROLLER_IP") {
            self.controller_ip = v;
        }
        if let Some(v) = lookup("NETCTRL_USERNAME") {
            self.username = v;
        }
        if let Some(v) = lookup("NETCTRL_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = lookup("NETCTRL_POLL_INTERVAL_SECS") {
            match v.parse() {
                Ok(secs) => self.poll_interval_secs = secs,
                Err(_) => tracing::warn!("Invalid NETCTRL_POLL_INTERVAL_SECS: {}", v),
            }
        }
        if let Some(v) = lookup("NETCTRL_MAX_POLLS") {
            match v.parse() {
                Ok(polls) => self.max_polls = polls,
                Err(_) => tracing::warn!("Invalid NETCTRL_MAX_POLLS: {}", v),
            }
        }
        if let Some(v) = lookup("NETCTRL_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(v);
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(dir) = Self::config_dir() else {
            return Ok(());
        };
        self.save_to(&dir).map(|_| ())
    }

    /// Write `config.json` under `dir`, returning its path
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir {}", dir.display()))?;

        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(path)
    }

    /// Reject configurations that cannot drive a controller
    pub fn validate(&self) -> Result<()> {
        if self.controller_ip.trim().is_empty() {
            anyhow::bail!("No controller configured. Set NETCTRL_CONTROLLER_IP or controller_ip in config");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if self.max_polls == 0 {
            anyhow::bail!("max_polls must be greater than zero");
        }
        Ok(())
    }

    /// API endpoint, `https://<controller_ip>/v1/api` unless a scheme is given
    pub fn base_url(&self) -> Result<Url> {
        let ip = self.controller_ip.trim().trim_end_matches('/');
        let raw = if ip.contains("://") {
            format!("{ip}/v1/api")
        } else {
            format!("https://{ip}/v1/api")
        };
        Url::parse(&raw).with_context(|| format!("Invalid controller address: {}", self.controller_ip))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
