//! Named triggers for recurring and one-shot batch jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a schedule entry fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleSpec {
    /// Standard cron expression (seconds field included, UTC).
    Cron { expression: String },
    /// Fire once at the given instant, then disable.
    OneShot {
        #[serde(with = "crate::timefmt")]
        at: DateTime<Utc>,
    },
}

/// A named trigger that launches a batch job from a stored request template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    /// Unique schedule name; also the advisory-lock key at trigger time.
    pub name: String,
    pub spec: ScheduleSpec,
    /// Serialized batch request submitted on trigger. Kept as JSON so the
    /// schedule store does not depend on the batch layer.
    pub template: serde_json::Value,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, with = "crate::timefmt::option")]
    pub last_fired_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}
