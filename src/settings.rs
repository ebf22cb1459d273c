use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Which clinic modules the host application has switched on for this
/// tenant. The queue only consults these; it never reads ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleFlags {
    pub scheduling: bool,
    pub point_of_sale: bool,
    pub transport: bool,
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self {
            scheduling: true,
            point_of_sale: true,
            transport: false,
        }
    }
}

/// Explicit queue configuration, passed into the controller instead of
/// looked up from globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettings {
    pub tenant_id: String,
    pub tick_interval_ms: u64,
    pub modules: ModuleFlags,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            tenant_id: "default".into(),
            tick_interval_ms: 1000,
            modules: ModuleFlags::default(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<QueueSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            QueueSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn queue(&self) -> QueueSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: QueueSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: QueueSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &QueueSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
