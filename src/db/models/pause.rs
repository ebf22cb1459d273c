use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A span during which elapsed-time accrual is suspended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseInterval {
    pub id: String,
    pub service_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub reason: String,
}
