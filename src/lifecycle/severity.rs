use serde::{Deserialize, Serialize};

/// Three-level visual classification of elapsed time against the expected
/// service duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    OnTime,
    AtRisk,
    Overdue,
}

/// A missing or zero expected duration means "unknown" and classifies as
/// OnTime. Thresholds sit at 80% and 120% of the expected duration.
pub fn classify(elapsed_minutes: f64, expected_duration_minutes: Option<u32>) -> Severity {
    let expected = match expected_duration_minutes {
        Some(minutes) if minutes > 0 => minutes as f64,
        _ => return Severity::OnTime,
    };

    if elapsed_minutes <= expected * 0.8 {
        Severity::OnTime
    } else if elapsed_minutes <= expected * 1.2 {
        Severity::AtRisk
    } else {
        Severity::Overdue
    }
}
