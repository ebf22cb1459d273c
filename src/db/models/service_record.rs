use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PauseInterval;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ServiceStatus {
    Scheduled,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Scheduled => "Scheduled",
            ServiceStatus::InProgress => "InProgress",
            ServiceStatus::Paused => "Paused",
            ServiceStatus::Completed => "Completed",
            ServiceStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and Cancelled accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Completed | ServiceStatus::Cancelled)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scheduled service instance moving through the status lifecycle.
///
/// Mutated exclusively through the transition operation; cancellation is a
/// status value, not a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub tenant_id: String,
    pub service_name: String,
    pub status: ServiceStatus,
    /// Set on the first transition into InProgress, never cleared.
    pub start_time: Option<DateTime<Utc>>,
    /// Set on transition into Completed.
    pub end_time: Option<DateTime<Utc>>,
    pub expected_duration_minutes: Option<u32>,
    /// Ordered by pause start; an entry with `ended_at == None` is the
    /// currently open pause.
    pub pauses: Vec<PauseInterval>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    pub fn open_pause(&self) -> Option<&PauseInterval> {
        self.pauses.iter().find(|pause| pause.ended_at.is_none())
    }

    pub fn open_pause_count(&self) -> usize {
        self.pauses
            .iter()
            .filter(|pause| pause.ended_at.is_none())
            .count()
    }
}
