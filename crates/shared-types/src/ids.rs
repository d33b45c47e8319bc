//! Prefixed record ids and gateway timestamps.
//!
//! Timestamps are RFC-3339 UTC with microsecond precision, so lexicographic
//! order equals chronological order and a timestamp string can serve directly
//! as a pagination cursor.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Current time as an RFC-3339 UTC string (`2026-01-02T03:04:05.123456Z`).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// New prefixed record id, e.g. `env_9f8c2d...`.
pub fn rand_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
