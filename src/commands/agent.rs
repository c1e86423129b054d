use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::agent::{self, AgentState, PollingScheduler};
use crate::config::{self, AgentConfig, AgentSettings, DayBoundary, FamlyConfig, LoggingConfig};
use crate::famly::Child;
use crate::sensor::{self, ChildSensors, DeviceInfo};

use super::utils::{format_duration, init_logging};

/// Options collected by `setup`
pub struct SetupOptions {
    pub email: String,
    pub password: String,
    pub children: Vec<String>,
    pub poll_interval: u64,
    pub base_url: Option<String>,
    pub day_boundary: DayBoundary,
}

fn resolve_config_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => config::get_agent_config_path(),
    }
}

fn load_config(config_path: &Path) -> Result<AgentConfig> {
    AgentConfig::load(config_path)
        .context("Failed to load agent configuration. Run 'famly-presence setup' first.")
}

/// Setup agent configuration
pub fn setup(options: SetupOptions, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    init_logging(verbose, None)?;

    println!("Famly Childcare Presence - Setup");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let mut famly = FamlyConfig::new(options.email, options.password);
    if let Some(base_url) = options.base_url {
        famly.base_url = base_url;
    }

    let session = famly.session()?;
    println!("Logging in to {}...", session.client().base_url());

    let runtime = tokio::runtime::Runtime::new()?;
    let available = runtime.block_on(async {
        if !session.authenticate().await {
            anyhow::bail!("Login failed: invalid credentials or Famly unreachable");
        }
        println!("✓ Logged in as {}", session.email());

        session
            .fetch_children()
            .await
            .context("Failed to fetch children from Famly")
    })?;

    if available.is_empty() {
        anyhow::bail!("No children found for this account");
    }

    let children = select_children(&available, &options.children)?;
    println!("✓ Tracking {} children", children.len());
    for (id, name) in &children {
        println!("    - {} ({})", name, id);
    }

    let config = AgentConfig {
        famly,
        children,
        agent: AgentSettings {
            poll_interval: options.poll_interval,
            day_boundary: options.day_boundary,
            ..AgentSettings::default()
        },
        logging: LoggingConfig::default(),
    };

    config.validate().context("Invalid configuration")?;

    let config_path = resolve_config_path(config_path)?;
    config.save(&config_path)?;
    println!("✓ Configuration saved to: {}", config_path.display());

    println!();
    println!("Setup complete!");
    println!();
    println!("Next steps:");
    println!("  1. Check presence once:");
    println!("     famly-presence check-now");
    println!("  2. Start the agent:");
    println!("     famly-presence start");
    println!();
    println!("The agent will check every {} seconds.", options.poll_interval);

    Ok(())
}

/// Pick the children to track: all when none were requested
fn select_children(available: &[Child], requested: &[String]) -> Result<BTreeMap<String, String>> {
    if requested.is_empty() {
        return Ok(available
            .iter()
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect());
    }

    requested
        .iter()
        .map(|id| {
            available
                .iter()
                .find(|c| &c.id == id)
                .map(|c| (c.id.clone(), c.name.clone()))
                .with_context(|| format!("Child '{}' is not visible to this account", id))
        })
        .collect()
}

/// List children visible to the configured account
pub fn children(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = load_config(&config_path)?;
    init_logging(verbose, Some(&config.logging))?;

    let session = config.famly.session()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let children = runtime.block_on(async {
        if !session.authenticate().await {
            anyhow::bail!("Login failed for {}", session.email());
        }
        session
            .fetch_children()
            .await
            .context("Failed to fetch children from Famly")
    })?;

    println!("Children visible to {}:", config.famly.email);
    for child in &children {
        let marker = if config.children.contains_key(&child.id) { "*" } else { " " };
        println!("  {} {}  {}", marker, child.id, child.name);
    }
    println!();
    println!("* = tracked");

    Ok(())
}

/// Poll every tracked child now
pub fn check_now(json: bool, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = load_config(&config_path)?;
    init_logging(verbose, Some(&config.logging))?;

    let state_path = agent::get_agent_state_path()?;

    if !json {
        println!("Checking childcare presence...");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let state = runtime.block_on(agent::check_once(&config, &state_path))?;

    let sensors = sensor::build_sensors(&config, Some(&state));

    if json {
        let views: Vec<_> = sensors.iter().map(ChildSensors::view).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&views).context("Failed to serialize results")?
        );
    } else {
        println!();
        print_sensors(&sensors);
    }

    Ok(())
}

/// Run the agent in the foreground
pub fn start(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = load_config(&config_path)?;
    init_logging(verbose, Some(&config.logging))?;

    let state_path = agent::get_agent_state_path()?;

    println!("Starting agent in foreground mode...");
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(agent::run_agent_daemon(config, &state_path))
}

/// Show agent status
pub fn status(config_path: Option<PathBuf>) -> Result<()> {
    println!("Famly Childcare Presence Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config_path = resolve_config_path(config_path)?;
    let config = AgentConfig::load(&config_path)
        .context("Agent not configured. Run 'famly-presence setup' first.")?;

    let device = DeviceInfo::for_config(&config);
    let scheduler = PollingScheduler::new(config.agent.poll_interval, config.agent.poll_jitter);

    println!("Account:       {}", device.name);
    println!("Entry ID:      {}", device.identifier);
    println!("Famly URL:     {}", config.famly.base_url);
    println!("Poll Interval: {} seconds", scheduler.interval().as_secs());
    println!("Day Boundary:  {:?}", config.agent.day_boundary);

    let state = AgentState::load(&agent::get_agent_state_path()?)?;

    println!();
    match state.as_ref().and_then(|s| s.last_checked) {
        Some(last_checked) => {
            let ago = chrono::Utc::now() - last_checked;
            println!(
                "Last checked:  {} ({} ago)",
                last_checked.format("%Y-%m-%d %H:%M:%S %Z"),
                format_duration(ago)
            );
            let next = scheduler
                .next_poll_after(last_checked)
                .map(|next| next.format("%Y-%m-%d %H:%M:%S %Z").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("Next check:    ~{}", next);
        }
        None => println!("Status: Not yet run (no state file)"),
    }

    println!();
    print_sensors(&sensor::build_sensors(&config, state.as_ref()));

    Ok(())
}

fn print_sensors(sensors: &[ChildSensors]) {
    for child in sensors {
        let state = child.status.state().unwrap_or("unavailable");
        println!("  {:<20} {}", child.child_name, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<Child> {
        vec![
            Child { id: "c1".to_string(), name: "Alice".to_string() },
            Child { id: "c2".to_string(), name: "Bob".to_string() },
        ]
    }

    #[test]
    fn select_children_defaults_to_all() {
        let selected = select_children(&available(), &[]).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.get("c2").map(String::as_str), Some("Bob"));
    }

    #[test]
    fn select_children_keeps_requested_only() {
        let selected = select_children(&available(), &["c2".to_string()]).unwrap();
        assert_eq!(selected, BTreeMap::from([("c2".to_string(), "Bob".to_string())]));
    }

    #[test]
    fn select_children_rejects_unknown_ids() {
        let err = select_children(&available(), &["c9".to_string()]).unwrap_err();
        assert!(err.to_string().contains("c9"));
    }

    #[test]
    fn resolve_config_path_prefers_explicit_path() {
        let path = PathBuf::from("/tmp/agent.toml");
        assert_eq!(resolve_config_path(Some(path.clone())).unwrap(), path);
    }
}
