use chrono::{DateTime, Utc};

use crate::db::models::ServiceRecord;

/// Net active elapsed seconds for a service record at `now`.
///
/// Derived purely from the record snapshot on every call, so a remounted
/// view or a missed tick recomputes the same value instead of resuming a
/// stale counter. A record with no `start_time` (including one malformed
/// while InProgress) yields 0 rather than an error.
pub fn active_seconds(record: &ServiceRecord, now: DateTime<Utc>) -> i64 {
    let Some(start) = record.start_time else {
        return 0;
    };

    let raw = (now - start).num_seconds();
    let mut paused: i64 = 0;
    for pause in &record.pauses {
        // An open pause accrues up to `now`; spans clamp to guard against
        // clock skew and malformed intervals.
        let end = pause.ended_at.unwrap_or(now);
        paused += (end - pause.started_at).num_seconds().max(0);
    }

    (raw - paused).max(0)
}
