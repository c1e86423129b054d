use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DayBoundary;

/// Famly Childcare presence agent
///
/// Polls Famly check-in/check-out events and reports, per child, whether the
/// child is currently at childcare.
#[derive(Parser, Debug)]
#[command(name = "famly-presence")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to agent configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in, pick children to track and save the configuration
    Setup {
        /// Famly account email
        #[arg(long)]
        email: String,

        /// Famly account password
        #[arg(long, env = "FAMLY_PASSWORD", hide_env_values = true)]
        password: String,

        /// Child id to track (repeatable; defaults to all children)
        #[arg(long = "child")]
        children: Vec<String>,

        /// Polling interval in seconds
        #[arg(long, default_value = "600")]
        poll_interval: u64,

        /// Famly API base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Which date counts as "today" when querying the calendar
        #[arg(long, value_enum, default_value_t = DayBoundary::Utc)]
        day_boundary: DayBoundary,
    },
    /// List children visible to the configured account
    Children,
    /// Poll every tracked child now and print the result
    CheckNow {
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the polling agent in the foreground
    Start,
    /// Show configuration and the last poll result
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn setup_collects_repeated_children() {
        let args = Args::parse_from([
            "famly-presence",
            "setup",
            "--email",
            "parent@example.com",
            "--password",
            "hunter2",
            "--child",
            "c1",
            "--child",
            "c2",
        ]);

        match args.command {
            Commands::Setup {
                children,
                poll_interval,
                day_boundary,
                base_url,
                ..
            } => {
                assert_eq!(children, vec!["c1", "c2"]);
                assert_eq!(poll_interval, 600);
                assert_eq!(day_boundary, DayBoundary::Utc);
                assert!(base_url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = Args::parse_from(["famly-presence", "check-now", "--json", "-v", "-c", "/tmp/a.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/a.toml")));
        assert!(matches!(args.command, Commands::CheckNow { json: true }));
    }
}
