use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::famly::{self, Credentials, FamlyClient, Session};

const MIN_POLL_INTERVAL: u64 = 60;
const MAX_POLL_INTERVAL: u64 = 86_400;
const MAX_POLL_JITTER: u64 = 3_600;

/// Agent configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    pub famly: FamlyConfig,

    /// Tracked children, id -> display name
    #[serde(default)]
    pub children: BTreeMap<String, String>,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Famly account settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FamlyConfig {
    pub email: String,

    pub password: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,
}

/// Agent settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    /// How often to poll (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Random delay added to each interval (seconds)
    #[serde(default)]
    pub poll_jitter: u64,

    /// Which calendar day counts as "today"
    #[serde(default)]
    pub day_boundary: DayBoundary,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Timezone used to pick the calendar day queried
///
/// `Utc` can lag or lead the daycare's local date around midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Utc,
    Local,
}

impl DayBoundary {
    /// Today's date under this policy
    pub fn today(&self) -> NaiveDate {
        match self {
            DayBoundary::Utc => Utc::now().date_naive(),
            DayBoundary::Local => Local::now().date_naive(),
        }
    }
}

// Default values
fn default_base_url() -> String {
    famly::DEFAULT_BASE_URL.to_string()
}

fn default_device_id() -> String {
    famly::DEFAULT_DEVICE_ID.to_string()
}

fn default_poll_interval() -> u64 {
    600 // 10 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            poll_jitter: 0,
            day_boundary: DayBoundary::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl FamlyConfig {
    pub fn new(email: String, password: String) -> Self {
        Self {
            email,
            password,
            base_url: default_base_url(),
            device_id: default_device_id(),
        }
    }

    /// Build an unauthenticated session for this account
    pub fn session(&self) -> Result<Session> {
        let client = FamlyClient::new(&self.base_url, &self.device_id)
            .context("Failed to create Famly client")?;

        Ok(Session::new(
            client,
            Credentials {
                email: self.email.clone(),
                password: self.password.clone(),
            },
        ))
    }
}

impl AgentConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Validate config
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Serialize to TOML
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // Holds the account password
        crate::platform::common::atomic_write_private(path, toml.as_bytes())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.famly.email.trim().is_empty() {
            anyhow::bail!("Famly email must not be empty");
        }

        if self.famly.password.is_empty() {
            anyhow::bail!("Famly password must not be empty");
        }

        famly::validate_base_url(&self.famly.base_url).context("Invalid Famly base URL")?;

        uuid::Uuid::parse_str(&self.famly.device_id)
            .with_context(|| format!("Device id must be a UUID (got: {})", self.famly.device_id))?;

        if self.children.is_empty() {
            anyhow::bail!("No children configured. Run 'famly-presence setup' to select children.");
        }

        if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&self.agent.poll_interval) {
            anyhow::bail!(
                "Poll interval must be between {} and {} seconds (got: {})",
                MIN_POLL_INTERVAL,
                MAX_POLL_INTERVAL,
                self.agent.poll_interval
            );
        }

        if self.agent.poll_jitter > MAX_POLL_JITTER {
            anyhow::bail!(
                "Poll jitter must be at most {} seconds (got: {})",
                MAX_POLL_JITTER,
                self.agent.poll_jitter
            );
        }

        Ok(())
    }

    /// Stable identifier for this account, used in sensor unique ids
    pub fn entry_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.famly.email.trim().to_lowercase().as_bytes());
        let digest = hasher.finalize();

        digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
    }
}

/// Get the agent config file path
pub fn get_agent_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "famly-presence")
        .context("Could not determine config directory")?;

    Ok(dirs.config_dir().join("agent.toml"))
}
