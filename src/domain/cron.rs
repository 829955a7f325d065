use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between two runs of a daily task.
pub const DAY_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronMode {
    /// Triggered while serving requests
    Internal,
    /// Triggered by an external scheduler (system cron)
    External,
}

impl CronMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CronMode::Internal => "internal",
            CronMode::External => "external",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "internal" => Some(CronMode::Internal),
            "external" => Some(CronMode::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for CronMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A periodic task registered with the host scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronTask {
    /// Item type owning the task; used to unregister everything at once
    pub itemtype: String,
    pub name: String,
    pub frequency_secs: i64,
    pub mode: CronMode,
    pub comment: String,
    pub last_run: Option<DateTime<Utc>>,
}

impl CronTask {
    pub fn new(
        itemtype: impl Into<String>,
        name: impl Into<String>,
        frequency_secs: i64,
        mode: CronMode,
    ) -> Self {
        Self {
            itemtype: itemtype.into(),
            name: name.into(),
            frequency_secs,
            mode,
            comment: String::new(),
            last_run: None,
        }
    }
}
