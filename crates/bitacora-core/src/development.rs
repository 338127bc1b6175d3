use crate::config::LifecycleConfig;
use crate::error::{BitacoraError, Result};
use crate::paths;
use crate::stage::{EmbeddedStage, StageCatalog, StageRef, StageResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Development
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Development {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageRef>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may change on an existing development. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct DevelopmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub stage_id: Option<u32>,
    pub provider: Option<String>,
    pub responsible: Option<String>,
}

/// Flattened view used by listings and detail output.
#[derive(Debug, Clone, Serialize)]
pub struct DevelopmentSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub stage: u32,
    pub stage_name: Option<String>,
    pub progress: u32,
    pub cancelled: bool,
    pub provider: Option<String>,
    pub responsible: Option<String>,
}

impl Development {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            current_stage_id: None,
            current_stage: None,
            status: "activo".to_string(),
            provider: None,
            responsible: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn create(root: &Path, dev: Development) -> Result<Self> {
        paths::validate_id(&dev.id)?;
        if Self::exists(root, &dev.id) {
            return Err(BitacoraError::DevelopmentExists(dev.id));
        }
        dev.save(root)?;
        info!(id = %dev.id, "development created");
        Ok(dev)
    }

    pub fn exists(root: &Path, id: &str) -> bool {
        paths::validate_id(id).is_ok() && paths::development_manifest(root, id).exists()
    }

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        paths::validate_id(id)?;
        let manifest = paths::development_manifest(root, id);
        if !manifest.exists() {
            return Err(BitacoraError::DevelopmentNotFound(id.to_string()));
        }
        let data = std::fs::read_to_string(&manifest)?;
        let dev: Development = serde_yaml::from_str(&data)?;
        Ok(dev)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        paths::validate_id(&self.id)?;
        let manifest = paths::development_manifest(root, &self.id);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&manifest, data.as_bytes())
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let dir = root.join(paths::DEVELOPMENTS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut devs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &id) {
                    Ok(d) => devs.push(d),
                    Err(BitacoraError::DevelopmentNotFound(_)) => {}
                    Err(BitacoraError::InvalidId(_)) => {
                        warn!(dir = %id, "skipping directory with an invalid development id");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        devs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(devs)
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Point the development at a catalog stage, keeping the embedded name in
    /// sync so consumers that only read `current_stage` see the same value.
    pub fn set_stage(&mut self, stage_id: u32, catalog: &StageCatalog) {
        self.current_stage_id = Some(i64::from(stage_id));
        self.current_stage = Some(StageRef::Embedded(EmbeddedStage {
            id: Some(i64::from(stage_id)),
            stage_name: catalog.get(stage_id).map(|s| s.label()),
        }));
        self.updated_at = Utc::now();
    }

    pub fn apply(&mut self, update: DevelopmentUpdate, catalog: &StageCatalog) -> Result<()> {
        if let Some(stage_id) = update.stage_id {
            if catalog.get(stage_id).is_none() {
                return Err(BitacoraError::StageNotFound(stage_id.to_string()));
            }
            self.set_stage(stage_id, catalog);
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(provider) = update.provider {
            self.provider = Some(provider);
        }
        if let Some(responsible) = update.responsible {
            self.responsible = Some(responsible);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Derived state
    // ---------------------------------------------------------------------------

    pub fn stage_index(&self, resolver: &StageResolver) -> u32 {
        resolver.resolve_or_default(self.current_stage_id, self.current_stage.as_ref())
    }

    /// Cancelled by status or by sitting on the configured cancelled stage.
    pub fn is_cancelled(&self, lifecycle: &LifecycleConfig) -> bool {
        lifecycle.is_cancelled_status(&self.status)
            || self.stage_index(&StageResolver::from_config(lifecycle)) == lifecycle.cancelled_stage
    }

    pub fn progress_percent(&self, lifecycle: &LifecycleConfig) -> u32 {
        let resolver = StageResolver::from_config(lifecycle);
        resolver.progress_percent(self.stage_index(&resolver), self.is_cancelled(lifecycle))
    }

    pub fn summarize(&self, lifecycle: &LifecycleConfig, catalog: &StageCatalog) -> DevelopmentSummary {
        let resolver = StageResolver::from_config(lifecycle);
        let stage = self.stage_index(&resolver);
        let cancelled = self.is_cancelled(lifecycle);
        DevelopmentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status.clone(),
            stage,
            stage_name: catalog.get(stage).map(|s| s.name.clone()),
            progress: resolver.progress_percent(stage, cancelled),
            cancelled,
            provider: self.provider.clone(),
            responsible: self.responsible.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
