use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{PauseInterval, ServiceRecord, ServiceStatus};

/// Validation failures of the status-transition operation. None of these
/// mutate the record; callers surface them to the user and move on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move a {from} service to {to}")]
    InvalidTransition {
        from: ServiceStatus,
        to: ServiceStatus,
    },

    #[error("a pause reason is required")]
    MissingPauseReason,

    /// Resuming expects exactly one open pause; anything else means the
    /// pause log was corrupted outside the transition path and is not
    /// repaired here.
    #[error("pause log for service {service_id} has {open_count} open entries")]
    PauseLogCorrupt {
        service_id: String,
        open_count: usize,
    },
}

/// Caller-supplied data accompanying a transition request: `reason` for
/// pauses, `notes` for annotation alongside any transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionInput {
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl TransitionInput {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseEffect {
    Open {
        started_at: DateTime<Utc>,
        reason: String,
    },
    Close {
        ended_at: DateTime<Utc>,
    },
}

/// The effects of one validated transition, as data. The persistence layer
/// translates a plan into SQL without re-deciding lifecycle policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: ServiceStatus,
    pub set_start_time: Option<DateTime<Utc>>,
    pub set_end_time: Option<DateTime<Utc>>,
    pub pause_effect: Option<PauseEffect>,
}

impl TransitionPlan {
    fn status_only(status: ServiceStatus) -> Self {
        Self {
            status,
            set_start_time: None,
            set_end_time: None,
            pause_effect: None,
        }
    }
}

/// The single authoritative state machine over service statuses.
///
/// | From        | To         | Input            | Effect                      |
/// |-------------|------------|------------------|-----------------------------|
/// | Scheduled   | InProgress | —                | start_time = now if unset   |
/// | InProgress  | Paused     | non-empty reason | open a pause at now         |
/// | InProgress  | Completed  | —                | end_time = now              |
/// | Paused      | InProgress | —                | close the open pause at now |
/// | non-terminal| Cancelled  | —                | status only                 |
///
/// Every other pair is rejected without effect.
pub fn plan(
    record: &ServiceRecord,
    requested: ServiceStatus,
    input: &TransitionInput,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    use ServiceStatus::*;

    match (record.status, requested) {
        (Scheduled, InProgress) => Ok(TransitionPlan {
            set_start_time: record.start_time.is_none().then_some(now),
            ..TransitionPlan::status_only(InProgress)
        }),
        (InProgress, Paused) => {
            let reason = input.reason.as_deref().map(str::trim).unwrap_or_default();
            if reason.is_empty() {
                return Err(TransitionError::MissingPauseReason);
            }
            Ok(TransitionPlan {
                pause_effect: Some(PauseEffect::Open {
                    started_at: now,
                    reason: reason.to_string(),
                }),
                ..TransitionPlan::status_only(Paused)
            })
        }
        (InProgress, Completed) => Ok(TransitionPlan {
            set_end_time: Some(now),
            ..TransitionPlan::status_only(Completed)
        }),
        (Paused, InProgress) => {
            let open_count = record.open_pause_count();
            if open_count != 1 {
                return Err(TransitionError::PauseLogCorrupt {
                    service_id: record.id.clone(),
                    open_count,
                });
            }
            Ok(TransitionPlan {
                pause_effect: Some(PauseEffect::Close { ended_at: now }),
                ..TransitionPlan::status_only(InProgress)
            })
        }
        (from, Cancelled) if !from.is_terminal() => Ok(TransitionPlan::status_only(Cancelled)),
        (from, to) => Err(TransitionError::InvalidTransition { from, to }),
    }
}

/// Apply a plan to an in-memory record snapshot.
pub fn apply(record: &ServiceRecord, plan: &TransitionPlan, updated_at: DateTime<Utc>) -> ServiceRecord {
    let mut next = record.clone();
    next.status = plan.status;
    if let Some(start) = plan.set_start_time {
        next.start_time = Some(start);
    }
    if let Some(end) = plan.set_end_time {
        next.end_time = Some(end);
    }
    match &plan.pause_effect {
        Some(PauseEffect::Open { started_at, reason }) => next.pauses.push(PauseInterval {
            id: Uuid::new_v4().to_string(),
            service_id: next.id.clone(),
            started_at: *started_at,
            ended_at: None,
            reason: reason.clone(),
        }),
        Some(PauseEffect::Close { ended_at }) => {
            for pause in next.pauses.iter_mut().filter(|p| p.ended_at.is_none()) {
                pause.ended_at = Some(*ended_at);
            }
        }
        None => {}
    }
    next.updated_at = updated_at;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::active_seconds;
    use chrono::{Duration, TimeZone};

    const ALL: [ServiceStatus; 5] = [
        ServiceStatus::Scheduled,
        ServiceStatus::InProgress,
        ServiceStatus::Paused,
        ServiceStatus::Completed,
        ServiceStatus::Cancelled,
    ];

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    fn record(status: ServiceStatus) -> ServiceRecord {
        let start_time = match status {
            ServiceStatus::Scheduled => None,
            _ => Some(t0()),
        };
        let pauses = match status {
            ServiceStatus::Paused => vec![PauseInterval {
                id: "pause-1".into(),
                service_id: "svc-1".into(),
                started_at: t0() + Duration::seconds(60),
                ended_at: None,
                reason: "x-ray queue".into(),
            }],
            _ => Vec::new(),
        };
        ServiceRecord {
            id: "svc-1".into(),
            tenant_id: "clinic-1".into(),
            service_name: "Grooming".into(),
            status,
            start_time,
            end_time: None,
            expected_duration_minutes: Some(30),
            pauses,
            notes: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn allowed(from: ServiceStatus, to: ServiceStatus) -> bool {
        use ServiceStatus::*;
        matches!(
            (from, to),
            (Scheduled, InProgress)
                | (InProgress, Paused)
                | (InProgress, Completed)
                | (Paused, InProgress)
                | (Scheduled, Cancelled)
                | (InProgress, Cancelled)
                | (Paused, Cancelled)
        )
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        let input = TransitionInput::with_reason("lunch");
        for from in ALL {
            for to in ALL {
                let result = plan(&record(from), to, &input, t0() + Duration::seconds(10));
                assert_eq!(
                    result.is_ok(),
                    allowed(from, to),
                    "unexpected verdict for {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn full_lifecycle_scenario() {
        let now = |secs: i64| t0() + Duration::seconds(secs);
        let input = TransitionInput::default();

        let scheduled = record(ServiceStatus::Scheduled);
        let started = apply(
            &scheduled,
            &plan(&scheduled, ServiceStatus::InProgress, &input, now(0)).unwrap(),
            now(0),
        );
        assert_eq!(started.start_time, Some(t0()));

        let paused = apply(
            &started,
            &plan(
                &started,
                ServiceStatus::Paused,
                &TransitionInput::with_reason("lunch"),
                now(600),
            )
            .unwrap(),
            now(600),
        );
        let resumed = apply(
            &paused,
            &plan(&paused, ServiceStatus::InProgress, &input, now(900)).unwrap(),
            now(900),
        );
        let completed = apply(
            &resumed,
            &plan(&resumed, ServiceStatus::Completed, &input, now(1800)).unwrap(),
            now(1800),
        );

        assert_eq!(completed.status, ServiceStatus::Completed);
        assert_eq!(completed.end_time, Some(now(1800)));
        assert_eq!(completed.pauses.len(), 1);
        assert_eq!(completed.pauses[0].started_at, now(600));
        assert_eq!(completed.pauses[0].ended_at, Some(now(900)));
        assert_eq!(completed.pauses[0].reason, "lunch");
        assert_eq!(active_seconds(&completed, now(1800)), 1500);
    }

    #[test]
    fn pause_requires_a_reason() {
        let record = record(ServiceStatus::InProgress);
        for input in [
            TransitionInput::default(),
            TransitionInput::with_reason(""),
            TransitionInput::with_reason("   "),
        ] {
            assert_eq!(
                plan(&record, ServiceStatus::Paused, &input, t0()),
                Err(TransitionError::MissingPauseReason)
            );
        }
    }

    #[test]
    fn start_time_is_set_at_most_once() {
        let mut scheduled = record(ServiceStatus::Scheduled);
        scheduled.start_time = Some(t0() - Duration::seconds(120));

        let plan = plan(
            &scheduled,
            ServiceStatus::InProgress,
            &TransitionInput::default(),
            t0(),
        )
        .unwrap();
        assert_eq!(plan.set_start_time, None);
    }

    #[test]
    fn cancel_has_no_timestamp_effect() {
        let started = record(ServiceStatus::InProgress);
        let plan = plan(
            &started,
            ServiceStatus::Cancelled,
            &TransitionInput::default(),
            t0() + Duration::seconds(60),
        )
        .unwrap();
        assert_eq!(plan.set_start_time, None);
        assert_eq!(plan.set_end_time, None);
        assert_eq!(plan.pause_effect, None);

        let cancelled = apply(&started, &plan, t0() + Duration::seconds(60));
        assert_eq!(cancelled.status, ServiceStatus::Cancelled);
        assert_eq!(cancelled.end_time, None);
    }

    #[test]
    fn resume_rejects_a_corrupt_pause_log() {
        let mut zero_open = record(ServiceStatus::Paused);
        zero_open.pauses[0].ended_at = Some(t0() + Duration::seconds(90));
        assert!(matches!(
            plan(
                &zero_open,
                ServiceStatus::InProgress,
                &TransitionInput::default(),
                t0() + Duration::seconds(120)
            ),
            Err(TransitionError::PauseLogCorrupt { open_count: 0, .. })
        ));

        let mut two_open = record(ServiceStatus::Paused);
        let mut extra = two_open.pauses[0].clone();
        extra.id = "pause-2".into();
        two_open.pauses.push(extra);
        assert!(matches!(
            plan(
                &two_open,
                ServiceStatus::InProgress,
                &TransitionInput::default(),
                t0() + Duration::seconds(120)
            ),
            Err(TransitionError::PauseLogCorrupt { open_count: 2, .. })
        ));
    }
}
