use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::{
    db::{
        models::{ServiceRecord, ServiceStatus},
        Database,
    },
    events::EventBus,
    settings::{QueueSettings, SettingsStore},
    timer::ServiceTimerController,
};

/// Input for creating a queue item. Records always enter in Scheduled and
/// are mutated only through the transition operation afterwards.
#[derive(Debug, Clone)]
pub struct NewServiceRecord {
    pub service_name: String,
    pub expected_duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

/// The assembled queue engine: storage, settings, event bus, and the timer
/// controller, wired for one tenant.
pub struct ServiceQueue {
    db: Database,
    settings: SettingsStore,
    events: EventBus,
    timer: ServiceTimerController,
}

impl ServiceQueue {
    /// Open (or create) the queue under `data_dir`, reading `settings.json`
    /// if present.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        Self::assemble(data_dir, settings)
    }

    /// Open with explicit configuration, persisting it for later runs.
    pub fn open_with(data_dir: PathBuf, queue_settings: QueueSettings) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        settings.update(queue_settings)?;
        Self::assemble(data_dir, settings)
    }

    fn assemble(data_dir: PathBuf, settings: SettingsStore) -> Result<Self> {
        let db = Database::new(data_dir.join("vetqueue.sqlite3"))?;
        let events = EventBus::default();
        let tick_interval = Duration::from_millis(settings.queue().tick_interval_ms.max(1));
        let timer = ServiceTimerController::new(db.clone(), events.clone(), tick_interval);

        info!(
            "service queue ready for tenant {}",
            settings.queue().tenant_id
        );

        Ok(Self {
            db,
            settings,
            events,
            timer,
        })
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings.queue()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn timer(&self) -> &ServiceTimerController {
        &self.timer
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn enqueue(&self, new: NewServiceRecord) -> Result<ServiceRecord> {
        let settings = self.settings.queue();
        if !settings.modules.scheduling {
            anyhow::bail!(
                "scheduling module is disabled for tenant {}",
                settings.tenant_id
            );
        }

        let now = Utc::now();
        let record = ServiceRecord {
            id: Uuid::new_v4().to_string(),
            tenant_id: settings.tenant_id,
            service_name: new.service_name,
            status: ServiceStatus::Scheduled,
            start_time: None,
            end_time: None,
            expected_duration_minutes: new.expected_duration_minutes,
            pauses: Vec::new(),
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        self.db.create_service_record(&record).await?;
        info!("enqueued service {} ({})", record.id, record.service_name);
        Ok(record)
    }

    /// Every record for this tenant, active work ahead of terminal records.
    pub async fn board(&self) -> Result<Vec<ServiceRecord>> {
        self.db
            .list_service_records(&self.settings.queue().tenant_id)
            .await
    }

    pub async fn filter(&self, status: ServiceStatus) -> Result<Vec<ServiceRecord>> {
        self.db
            .filter_service_records(&self.settings.queue().tenant_id, status)
            .await
    }

    /// Re-arm tickers for records that were running when the host last shut
    /// down. Returns how many were resumed.
    pub async fn resume_in_progress(&self) -> Result<usize> {
        let records = self
            .db
            .list_in_progress(&self.settings.queue().tenant_id)
            .await?;

        for record in &records {
            warn!("re-arming ticker for in-flight service {}", record.id);
            self.timer.watch(&record.id).await?;
        }

        Ok(records.len())
    }
}
