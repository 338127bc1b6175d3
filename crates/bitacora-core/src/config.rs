use crate::error::{BitacoraError, Result};
use crate::paths;
use crate::types::same_text;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LifecycleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_stage_count")]
    pub stage_count: u32,
    #[serde(default = "default_cancelled_stage")]
    pub cancelled_stage: u32,
    #[serde(default = "default_cancelled_statuses")]
    pub cancelled_statuses: Vec<String>,
}

fn default_stage_count() -> u32 {
    11
}

fn default_cancelled_stage() -> u32 {
    11
}

fn default_cancelled_statuses() -> Vec<String> {
    vec!["cancelado".to_string(), "cancelled".to_string()]
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stage_count: default_stage_count(),
            cancelled_stage: default_cancelled_stage(),
            cancelled_statuses: default_cancelled_statuses(),
        }
    }
}

impl LifecycleConfig {
    pub fn is_cancelled_status(&self, status: &str) -> bool {
        self.cancelled_statuses
            .iter()
            .any(|s| same_text(s, status))
    }
}

// ---------------------------------------------------------------------------
// FollowUpSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowUpSettings {
    /// Reject recurring after-* rules that carry no cutoff date.
    #[serde(default)]
    pub require_cutoff: bool,
}

// ---------------------------------------------------------------------------
// GanttConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttConfig {
    #[serde(default = "default_padding_days")]
    pub padding_days: u32,
    #[serde(default = "default_min_width_percent")]
    pub min_width_percent: f64,
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

fn default_padding_days() -> u32 {
    7
}

fn default_min_width_percent() -> f64 {
    2.0
}

fn default_bar_width() -> usize {
    60
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            padding_days: default_padding_days(),
            min_width_percent: default_min_width_percent(),
            bar_width: default_bar_width(),
        }
    }
}

// ---------------------------------------------------------------------------
// ImportConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_import_columns")]
    pub columns: Vec<ColumnMapping>,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

fn default_import_columns() -> Vec<ColumnMapping> {
    [
        ("ID", "id"),
        ("Nombre", "name"),
        ("Estado", "status"),
        ("Etapa", "stage"),
        ("Proveedor", "provider"),
        ("Responsable", "responsible"),
    ]
    .into_iter()
    .map(|(source, target)| ColumnMapping {
        source: source.to_string(),
        target: target.to_string(),
    })
    .collect()
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_preview_limit() -> usize {
    20
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            columns: default_import_columns(),
            id_column: default_id_column(),
            preview_limit: default_preview_limit(),
        }
    }
}

impl ImportConfig {
    /// Target field name for a spreadsheet header. Unmapped headers keep their name.
    pub fn target_for(&self, header: &str) -> String {
        let header = header.trim();
        self.columns
            .iter()
            .find(|m| same_text(&m.source, header))
            .map(|m| m.target.clone())
            .unwrap_or_else(|| header.to_string())
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub follow_up: FollowUpSettings,
    #[serde(default)]
    pub gantt: GanttConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            lifecycle: LifecycleConfig::default(),
            follow_up: FollowUpSettings::default(),
            gantt: GanttConfig::default(),
            import: ImportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BitacoraError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.lifecycle.stage_count < 2 {
            push(
                WarnLevel::Error,
                format!(
                    "lifecycle.stage_count={} leaves no room for progress (minimum 2)",
                    self.lifecycle.stage_count
                ),
            );
        }
        if self.lifecycle.cancelled_stage == 0
            || self.lifecycle.cancelled_stage > self.lifecycle.stage_count
        {
            push(
                WarnLevel::Warning,
                format!(
                    "lifecycle.cancelled_stage={} is outside 1..={}",
                    self.lifecycle.cancelled_stage, self.lifecycle.stage_count
                ),
            );
        }

        if !(self.gantt.min_width_percent > 0.0 && self.gantt.min_width_percent <= 100.0) {
            push(
                WarnLevel::Warning,
                format!(
                    "gantt.min_width_percent={} should be in (0, 100]",
                    self.gantt.min_width_percent
                ),
            );
        }
        if self.gantt.bar_width < 10 {
            push(
                WarnLevel::Warning,
                format!("gantt.bar_width={} is too narrow to read", self.gantt.bar_width),
            );
        }

        let mut targets = HashSet::new();
        for mapping in &self.import.columns {
            if !targets.insert(mapping.target.as_str()) {
                push(
                    WarnLevel::Warning,
                    format!("import target '{}' is mapped more than once", mapping.target),
                );
            }
        }
        if !self.import.columns.is_empty() && !targets.contains(self.import.id_column.as_str()) {
            push(
                WarnLevel::Warning,
                format!(
                    "import.id_column '{}' is not the target of any column mapping",
                    self.import.id_column
                ),
            );
        }
        if self.import.preview_limit == 0 {
            push(
                WarnLevel::Warning,
                "import.preview_limit=0 hides every imported row".to_string(),
            );
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            push(
                WarnLevel::Warning,
                format!(
                    "unknown logging.level '{}' (expected one of {})",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
