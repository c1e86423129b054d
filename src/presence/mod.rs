// Presence resolution for a single child
//
// The calendar endpoint returns a loosely structured day of attendance events.
// This module turns that payload into one of two states. Everything in here is
// pure: no I/O, no clock, so it can be exercised directly from JSON fixtures.

mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use events::{EventKind, collect_events, latest_event};

/// Whether a child is currently checked into childcare
///
/// Defaults to `OutsideChildcare`: no evidence of a check-in means the child is not there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    AtChildcare,
    #[default]
    OutsideChildcare,
}

impl Presence {
    /// Human-readable state, as shown by the status sensor
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::AtChildcare => "At childcare",
            Presence::OutsideChildcare => "Outside childcare",
        }
    }

    /// True when the child is at childcare
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::AtChildcare)
    }
}

impl From<Option<EventKind>> for Presence {
    fn from(kind: Option<EventKind>) -> Self {
        match kind {
            Some(EventKind::CheckIn) => Presence::AtChildcare,
            Some(EventKind::CheckOut) | None => Presence::OutsideChildcare,
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
