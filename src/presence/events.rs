use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Attendance event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

/// The event that decides the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestEvent {
    pub kind: EventKind,
    pub at: Option<DateTime<Utc>>,
}

type KindStrategy = fn(&Value) -> Option<EventKind>;
type TimestampStrategy = fn(&Value) -> Option<DateTime<Utc>>;

/// Tried in order, first hit wins
const KIND_STRATEGIES: &[KindStrategy] = &[kind_from_embed, kind_from_type_fields, kind_from_title];

/// Tried in order, first field that parses wins
const TIMESTAMP_STRATEGIES: &[TimestampStrategy] = &[
    timestamp_from,
    timestamp_originator_occurred_at,
    timestamp_occurred_at,
    timestamp_originator_timestamp,
    timestamp_timestamp,
];

/// Phrases seen in event titles, English and Norwegian
const CHECK_OUT_PHRASES: &[&str] = &["sjekket ut", "checked out"];
const CHECK_IN_PHRASES: &[&str] = &["sjekket inn", "checked in"];

/// Flatten every event in the payload into one list
///
/// Events may sit under a top-level `events` array or inside `days[]` buckets,
/// and the whole thing may be wrapped in arrays. Non-container values are skipped.
pub fn collect_events(payload: &Value) -> Vec<&Value> {
    let mut events = Vec::new();
    collect_into(payload, &mut events);
    events
}

fn collect_into<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::Array(events)) = map.get("events") {
                out.extend(events.iter());
            }
            if let Some(Value::Array(days)) = map.get("days") {
                for day in days {
                    collect_into(day, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, out);
            }
        }
        _ => {}
    }
}

/// Pick the latest classifiable event
///
/// Events without a timestamp only count while nothing timestamped has been seen.
pub fn latest_event<'a, I>(events: I) -> Option<LatestEvent>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut latest: Option<LatestEvent> = None;

    for event in events {
        let Some(kind) = event_kind(event) else {
            continue;
        };

        let at = event_timestamp(event);
        let latest_at = latest.and_then(|l| l.at);

        match (at, latest_at) {
            (None, None) => latest = Some(LatestEvent { kind, at: None }),
            (None, Some(_)) => {}
            (Some(at), None) => latest = Some(LatestEvent { kind, at: Some(at) }),
            (Some(at), Some(current)) if at > current => {
                latest = Some(LatestEvent { kind, at: Some(at) })
            }
            (Some(_), Some(_)) => {}
        }
    }

    latest
}

/// Classify an event as check-in or check-out, if possible
fn event_kind(event: &Value) -> Option<EventKind> {
    KIND_STRATEGIES.iter().find_map(|strategy| strategy(event))
}

/// Extract the event time, if any field carries a parseable one
fn event_timestamp(event: &Value) -> Option<DateTime<Utc>> {
    TIMESTAMP_STRATEGIES.iter().find_map(|strategy| strategy(event))
}

fn kind_from_embed(event: &Value) -> Option<EventKind> {
    let embed_type = str_at(event, &["embed", "type"])?;
    match embed_type.to_uppercase().as_str() {
        "CHECK_IN" => Some(EventKind::CheckIn),
        "CHECK_OUT" => Some(EventKind::CheckOut),
        _ => None,
    }
}

fn kind_from_type_fields(event: &Value) -> Option<EventKind> {
    let type_name = str_at(event, &["originator", "type"])
        .or_else(|| str_at(event, &["originator", "__typename"]))
        .or_else(|| str_at(event, &["type"]))
        .or_else(|| str_at(event, &["eventType"]))?;

    let lower = type_name.to_lowercase();
    if lower.contains("checkin") || lower.contains("check_in") {
        Some(EventKind::CheckIn)
    } else if lower.contains("checkout") || lower.contains("check_out") {
        Some(EventKind::CheckOut)
    } else {
        None
    }
}

fn kind_from_title(event: &Value) -> Option<EventKind> {
    let title = str_at(event, &["title"])?.to_lowercase();
    if CHECK_OUT_PHRASES.iter().any(|phrase| title.contains(phrase)) {
        Some(EventKind::CheckOut)
    } else if CHECK_IN_PHRASES.iter().any(|phrase| title.contains(phrase)) {
        Some(EventKind::CheckIn)
    } else {
        None
    }
}

fn timestamp_from(event: &Value) -> Option<DateTime<Utc>> {
    str_at(event, &["from"]).and_then(parse_timestamp)
}

fn timestamp_originator_occurred_at(event: &Value) -> Option<DateTime<Utc>> {
    str_at(event, &["originator", "occurredAt"]).and_then(parse_timestamp)
}

fn timestamp_occurred_at(event: &Value) -> Option<DateTime<Utc>> {
    str_at(event, &["occurredAt"]).and_then(parse_timestamp)
}

fn timestamp_originator_timestamp(event: &Value) -> Option<DateTime<Utc>> {
    str_at(event, &["originator", "timestamp"]).and_then(parse_timestamp)
}

fn timestamp_timestamp(event: &Value) -> Option<DateTime<Utc>> {
    str_at(event, &["timestamp"]).and_then(parse_timestamp)
}

/// Non-empty string at a nested object path
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut node = value;
    for key in path {
        node = node.get(key)?;
    }
    node.as_str().filter(|s| !s.trim().is_empty())
}

/// Parse an ISO-8601 timestamp, normalizing to UTC
///
/// Timestamps without an offset are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        // A bare date means midnight
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Some(naive.and_utc())
}
