use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DayBoundary;
use crate::famly::{FamlyError, Session};
use crate::presence::{self, Presence};

/// Result of one poll cycle, child id -> presence (`None` = failed for that child)
pub type PollResults = BTreeMap<String, Option<Presence>>;

/// Resolves a child's current presence from today's calendar
#[derive(Debug)]
pub struct StatusResolver {
    session: Session,
    day_boundary: DayBoundary,
}

impl StatusResolver {
    pub fn new(session: Session, day_boundary: DayBoundary) -> Self {
        Self {
            session,
            day_boundary,
        }
    }

    /// Current presence for a child, or `None` if it could not be determined
    ///
    /// Never fails: every error is logged and turned into `None`.
    pub async fn get_status(&self, child_id: &str) -> Option<Presence> {
        match self.resolve(child_id).await {
            Ok(presence) => Some(presence),
            Err(e) => {
                tracing::error!("Error fetching calendar data for child {}: {}", child_id, e);
                None
            }
        }
    }

    async fn resolve(&self, child_id: &str) -> Result<Presence, FamlyError> {
        let client = self.session.client();
        let day = self.day_boundary.today();
        let token = self.session.token_or_login().await?;

        let payload = match client.calendar(&token, child_id, day).await {
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Access token expired. Re-authenticating...");
                let token = self.session.login().await?;
                client.calendar(&token, child_id, day).await?
            }
            other => other?,
        };

        let events = presence::collect_events(&payload);
        let latest = presence::latest_event(events.iter().copied());

        tracing::debug!(
            "Calendar parse: child={} day={} candidates={} latest_kind={:?} latest_time={:?}",
            child_id,
            day,
            events.len(),
            latest.map(|l| l.kind),
            latest.and_then(|l| l.at).map(|at| at.to_rfc3339()),
        );

        Ok(Presence::from(latest.map(|l| l.kind)))
    }
}

/// Resolve every child concurrently
///
/// Each child runs in its own task; a failure or panic in one leaves the
/// others untouched and yields `None` for that child.
pub async fn poll_children(
    resolver: &Arc<StatusResolver>,
    children: &BTreeMap<String, String>,
) -> PollResults {
    let ids: Vec<String> = children.keys().cloned().collect();

    let tasks = ids.iter().cloned().map(|child_id| {
        let resolver = Arc::clone(resolver);
        tokio::spawn(async move { resolver.get_status(&child_id).await })
    });

    let outcomes = join_all(tasks).await;

    let results: PollResults = ids
        .into_iter()
        .zip(outcomes)
        .map(|(child_id, outcome)| {
            let status = outcome.unwrap_or_else(|e| {
                tracing::error!("Status task for child {} failed: {}", child_id, e);
                None
            });
            (child_id, status)
        })
        .collect();

    if results.values().any(Option::is_none) {
        tracing::warn!("Failed to retrieve status for one or more children");
    }

    results
}
