use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use log::info;
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    db::{
        models::{ServiceRecord, ServiceStatus},
        Database,
    },
    events::{EventBus, QueueEvent},
    lifecycle::{self, TransitionError, TransitionInput},
};

use super::ServiceTimerState;

/// Failures of the queue operations, split so callers can tell a rejected
/// request (no mutation, fix the input) from a storage failure (no mutation
/// assumed committed, retry the same action).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Drives service records through the status lifecycle and owns the
/// per-record display tickers.
#[derive(Clone)]
pub struct ServiceTimerController {
    db: Database,
    events: EventBus,
    tickers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl ServiceTimerController {
    pub fn new(db: Database, events: EventBus, tick_interval: Duration) -> Self {
        Self {
            db,
            events,
            tickers: Arc::new(Mutex::new(HashMap::new())),
            tick_interval,
        }
    }

    /// Begin displaying a record. A record that is already InProgress starts
    /// ticking immediately; the returned snapshot is recomputed from the
    /// stored record, never resumed from prior local state.
    pub async fn watch(&self, service_id: &str) -> Result<ServiceTimerState, QueueError> {
        let record = self.db.get_service_record(service_id).await?;
        let state = ServiceTimerState::from_record(&record, Utc::now());
        if record.status == ServiceStatus::InProgress {
            self.spawn_ticker(record).await;
        }
        Ok(state)
    }

    /// Deterministic teardown when the host view unmounts.
    pub async fn unwatch(&self, service_id: &str) {
        if let Some(handle) = self.tickers.lock().await.remove(service_id) {
            handle.abort();
        }
    }

    pub async fn snapshot(&self, service_id: &str) -> Result<ServiceTimerState, QueueError> {
        let record = self.db.get_service_record(service_id).await?;
        Ok(ServiceTimerState::from_record(&record, Utc::now()))
    }

    /// The single authoritative status-transition operation.
    ///
    /// Validation failures emit a `TransitionRejected` event and leave both
    /// the record and the ticker untouched. Successful transitions persist
    /// first, then notify, then reconcile the ticker with the new status.
    pub async fn transition(
        &self,
        service_id: &str,
        requested: ServiceStatus,
        input: TransitionInput,
    ) -> Result<ServiceRecord, QueueError> {
        let record = self.db.get_service_record(service_id).await?;
        let now = Utc::now();

        let plan = match lifecycle::plan(&record, requested, &input, now) {
            Ok(plan) => plan,
            Err(err) => {
                self.events.emit(QueueEvent::TransitionRejected {
                    service_id: record.id.clone(),
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };

        self.db.apply_transition_plan(&record.id, &plan, now).await?;
        if input.notes.is_some() {
            self.db
                .update_service_notes(&record.id, input.notes.clone())
                .await?;
        }

        let updated = self.db.get_service_record(&record.id).await?;
        info!(
            "service {} moved {} -> {}",
            updated.id, record.status, updated.status
        );
        self.events.emit(QueueEvent::StatusChanged {
            service_id: updated.id.clone(),
            status: updated.status,
        });

        if updated.status == ServiceStatus::InProgress {
            self.spawn_ticker(updated.clone()).await;
        } else {
            self.unwatch(&updated.id).await;
        }

        if updated.status == ServiceStatus::Completed {
            self.events.emit(QueueEvent::ServiceCompleted {
                service_id: updated.id.clone(),
                record: updated.clone(),
            });
        }

        Ok(updated)
    }

    pub async fn annotate(
        &self,
        service_id: &str,
        notes: Option<String>,
    ) -> Result<(), QueueError> {
        self.db.update_service_notes(service_id, notes).await?;
        Ok(())
    }

    /// Abort every ticker. Used by hosts shutting the queue view down.
    pub async fn shutdown(&self) {
        let mut tickers = self.tickers.lock().await;
        for (_, handle) in tickers.drain() {
            handle.abort();
        }
    }

    /// One tokio task per watched record, keyed by record id. Spawning
    /// aborts any previous task for that id, so a remounted view can never
    /// stack a duplicate ticker. The task only reads the record snapshot
    /// and emits; all writes stay on the transition path.
    async fn spawn_ticker(&self, record: ServiceRecord) {
        let mut tickers = self.tickers.lock().await;
        if let Some(previous) = tickers.remove(&record.id) {
            previous.abort();
        }

        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let service_id = record.id.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;
                let now = Utc::now();
                let elapsed_seconds = lifecycle::active_seconds(&record, now);
                let severity = lifecycle::classify(
                    elapsed_seconds as f64 / 60.0,
                    record.expected_duration_minutes,
                );
                events.emit(QueueEvent::Tick {
                    service_id: record.id.clone(),
                    elapsed_seconds,
                    severity,
                });
            }
        });

        tickers.insert(service_id, handle);
    }
}
