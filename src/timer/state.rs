use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{ServiceRecord, ServiceStatus};
use crate::lifecycle::{self, Severity};

/// Display snapshot of one service timer.
///
/// Always rebuilt from the record and a clock reading, never carried across
/// view remounts, so the displayed value can never drift from the
/// authoritative calculation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTimerState {
    pub service_id: String,
    pub status: ServiceStatus,
    pub elapsed_seconds: i64,
    pub severity: Severity,
    pub expected_duration_minutes: Option<u32>,
}

impl ServiceTimerState {
    pub fn from_record(record: &ServiceRecord, now: DateTime<Utc>) -> Self {
        let elapsed_seconds = lifecycle::active_seconds(record, now);
        let severity = lifecycle::classify(
            elapsed_seconds as f64 / 60.0,
            record.expected_duration_minutes,
        );
        Self {
            service_id: record.id.clone(),
            status: record.status,
            elapsed_seconds,
            severity,
            expected_duration_minutes: record.expected_duration_minutes,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.status == ServiceStatus::InProgress
    }
}
