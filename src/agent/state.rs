use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::presence::Presence;
use crate::resolver::PollResults;

/// Current state file version
const STATE_VERSION: &str = "1.0";

/// Outcome of the most recent poll, the only thing the agent persists
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentState {
    /// State version
    pub version: String,

    /// When the last poll cycle finished
    pub last_checked: Option<DateTime<Utc>>,

    /// Per-child result of the last poll (`None` = failed)
    #[serde(default)]
    pub results: PollResults,
}

impl AgentState {
    /// Create a new, empty agent state
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_checked: None,
            results: PollResults::new(),
        }
    }

    /// Load agent state from file
    ///
    /// A missing file or a version mismatch yields `None`.
    pub fn load(state_path: &Path) -> Result<Option<Self>> {
        if !state_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(state_path)
            .with_context(|| format!("Failed to read state file: {}", state_path.display()))?;

        let state: AgentState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", state_path.display()))?;

        if state.version != STATE_VERSION {
            tracing::warn!(
                "State file version mismatch (expected {}, got {}). Treating as new state.",
                STATE_VERSION,
                state.version
            );
            return Ok(None);
        }

        Ok(Some(state))
    }

    /// Save agent state to file
    pub fn save(&self, state_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        crate::platform::common::atomic_write(state_path, content.as_bytes())
            .with_context(|| format!("Failed to write state file: {}", state_path.display()))?;

        Ok(())
    }

    /// Record the results of a finished poll
    pub fn update_polled(&mut self, results: PollResults) {
        self.results = results;
        self.last_checked = Some(Utc::now());
    }

    /// Last result for a child, `None` if it failed or was never polled
    pub fn presence(&self, child_id: &str) -> Option<Presence> {
        self.results.get(child_id).copied().flatten()
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the agent state file path
pub fn get_agent_state_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "famly-presence")
        .context("Could not determine state file location")?;

    Ok(dirs.data_local_dir().join("state.json"))
}
