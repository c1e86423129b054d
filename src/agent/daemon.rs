use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use super::{AgentState, PollingScheduler};
use crate::config::AgentConfig;
use crate::resolver::{StatusResolver, poll_children};

/// Build the resolver for a configured account
pub fn build_resolver(config: &AgentConfig) -> Result<Arc<StatusResolver>> {
    let session = config.famly.session()?;
    Ok(Arc::new(StatusResolver::new(session, config.agent.day_boundary)))
}

/// Run the agent daemon until Ctrl+C
pub async fn run_agent_daemon(config: AgentConfig, state_path: &Path) -> Result<()> {
    tracing::info!("Starting agent daemon");
    tracing::info!("Famly account: {}", config.famly.email);
    tracing::info!("Tracking {} children", config.children.len());
    tracing::info!(
        "Poll interval: {} seconds (+{} seconds jitter)",
        config.agent.poll_interval,
        config.agent.poll_jitter
    );

    let resolver = build_resolver(&config)?;
    let scheduler = PollingScheduler::new(config.agent.poll_interval, config.agent.poll_jitter);

    loop {
        // A failed cycle never stops the loop
        match poll_and_save(&resolver, &config, state_path).await {
            Ok(state) => log_results(&config, &state),
            Err(e) => tracing::error!("Failed to save poll results: {:#}", e),
        }

        tokio::select! {
            _ = scheduler.sleep_until_next_poll() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping agent");
                return Ok(());
            }
        }
    }
}

/// Poll every child once and save the results
pub async fn check_once(config: &AgentConfig, state_path: &Path) -> Result<AgentState> {
    let resolver = build_resolver(config)?;
    poll_and_save(&resolver, config, state_path).await
}

async fn poll_and_save(
    resolver: &Arc<StatusResolver>,
    config: &AgentConfig,
    state_path: &Path,
) -> Result<AgentState> {
    let results = poll_children(resolver, &config.children).await;

    let mut state = AgentState::new();
    state.update_polled(results);
    state.save(state_path)?;

    Ok(state)
}

fn log_results(config: &AgentConfig, state: &AgentState) {
    for (child_id, name) in &config.children {
        match state.presence(child_id) {
            Some(presence) => tracing::info!("{} ({}): {}", name, child_id, presence),
            None => tracing::warn!("{} ({}): status unavailable", name, child_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentSettings, FamlyConfig, LoggingConfig};
    use crate::presence::Presence;
    use crate::testing::{FakeFamly, TEST_EMAIL, TEST_PASSWORD};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn config(base_url: String) -> AgentConfig {
        let mut famly = FamlyConfig::new(TEST_EMAIL.to_string(), TEST_PASSWORD.to_string());
        famly.base_url = base_url;

        AgentConfig {
            famly,
            children: BTreeMap::from([
                ("c1".to_string(), "Alice".to_string()),
                ("c2".to_string(), "Bob".to_string()),
            ]),
            agent: AgentSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[tokio::test]
    async fn check_once_polls_and_persists_results() {
        let fake = FakeFamly::default().with_calendar(
            "c1",
            json!({ "events": [{ "title": "Checked in", "from": "2024-05-02T08:00:00Z" }] }),
        );
        let config = config(fake.spawn().await);
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("state.json");

        let state = check_once(&config, &state_path).await.unwrap();

        assert_eq!(state.presence("c1"), Some(Presence::AtChildcare));
        assert_eq!(state.results.get("c2"), Some(&None));
        assert!(state.last_checked.is_some());

        let saved = AgentState::load(&state_path).unwrap().unwrap();
        assert_eq!(saved.results, state.results);
    }

    #[tokio::test]
    async fn check_once_replaces_unreadable_state() {
        let fake = FakeFamly::default()
            .with_calendar("c1", json!([]))
            .with_calendar("c2", json!([]));
        let config = config(fake.spawn().await);
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(&state_path, "garbage").unwrap();

        let state = check_once(&config, &state_path).await.unwrap();

        assert_eq!(state.presence("c1"), Some(Presence::OutsideChildcare));
        assert_eq!(state.presence("c2"), Some(Presence::OutsideChildcare));
        assert!(AgentState::load(&state_path).unwrap().is_some());
    }
}
