//! Lifecycle stage catalog and resolution of loosely-typed stage references.
//!
//! A development may carry its stage as a bare numeric id, as a display string
//! such as `"3. Aprobación"`, or as an embedded object with either field. All
//! three forms resolve to one clamped stage index through [`StageResolver`].

use crate::config::LifecycleConfig;
use crate::error::{Result, StageParseError};
use crate::paths;
use crate::types::same_text;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const FIRST_STAGE: u32 = 1;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub phase: String,
    pub estimated_days: u32,
    pub responsible: String,
    #[serde(default)]
    pub milestone: bool,
}

impl Stage {
    /// Display label in the `"<id>. <name>"` form used by stage strings.
    pub fn label(&self) -> String {
        format!("{}. {}", self.id, self.name)
    }
}

// ---------------------------------------------------------------------------
// StageCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCatalog {
    pub stages: Vec<Stage>,
}

impl Default for StageCatalog {
    fn default() -> Self {
        let rows: [(&str, &str, u32, &str, bool); 11] = [
            ("Solicitud", "Inicio", 2, "usuario", false),
            ("Análisis", "Análisis", 5, "equipo_interno", false),
            ("Aprobación", "Análisis", 3, "gerencia", true),
            ("Cotización", "Contratación", 5, "proveedor", false),
            ("Contratación", "Contratación", 7, "gerencia", true),
            ("Desarrollo", "Construcción", 20, "proveedor", false),
            ("Pruebas", "Construcción", 10, "equipo_interno", false),
            ("Certificación", "Validación", 5, "usuario", true),
            ("Despliegue", "Cierre", 2, "proveedor", false),
            ("Cierre", "Cierre", 1, "equipo_interno", true),
            ("Cancelado", "Cierre", 0, "gerencia", false),
        ];
        let stages = rows
            .iter()
            .zip(1u32..)
            .map(|(&(name, phase, days, responsible, milestone), id)| Stage {
                id,
                code: format!("E{id:02}"),
                name: name.to_string(),
                phase: phase.to_string(),
                estimated_days: days,
                responsible: responsible.to_string(),
                milestone,
            })
            .collect();
        Self { stages }
    }
}

impl StageCatalog {
    /// Load the catalog, falling back to the built-in one when no file exists.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::stages_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let mut catalog: StageCatalog = serde_yaml::from_str(&data)?;
        catalog.stages.sort_by_key(|s| s.id);
        Ok(catalog)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::stages_path(root), self)
    }

    pub fn get(&self, id: u32) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| same_text(&s.name, name) || same_text(&s.label(), name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// StageRef
// ---------------------------------------------------------------------------

/// Embedded stage object as delivered alongside a development record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedStage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageRef {
    ById(i64),
    ByName(String),
    Embedded(EmbeddedStage),
}

impl StageRef {
    /// Parse a command-line style reference: digits become `ById`, anything
    /// else `ByName`.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<i64>() {
            Ok(id) => StageRef::ById(id),
            Err(_) => StageRef::ByName(input.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

static LEADING_INT_RE: OnceLock<Regex> = OnceLock::new();

fn leading_int_re() -> &'static Regex {
    LEADING_INT_RE.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").unwrap())
}

/// Leading integer of the segment before the first `.`: `"3. Aprobación"` is 3.
pub fn parse_stage_number(input: &str) -> std::result::Result<i64, StageParseError> {
    let head = input.split('.').next().unwrap_or_default();
    leading_int_re()
        .captures(head)
        .and_then(|c| c[1].parse::<i64>().ok())
        .ok_or_else(|| StageParseError {
            input: input.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageResolver {
    last_stage: u32,
}

impl Default for StageResolver {
    fn default() -> Self {
        Self { last_stage: 11 }
    }
}

impl StageResolver {
    pub fn new(last_stage: u32) -> Self {
        Self {
            last_stage: last_stage.max(FIRST_STAGE),
        }
    }

    pub fn from_config(cfg: &LifecycleConfig) -> Self {
        Self::new(cfg.stage_count)
    }

    pub fn last_stage(&self) -> u32 {
        self.last_stage
    }

    pub fn clamp(&self, stage: i64) -> u32 {
        stage.clamp(FIRST_STAGE as i64, self.last_stage as i64) as u32
    }

    /// Resolve a record's stage fields. A numeric id wins over the reference;
    /// an embedded id wins over an embedded name. Absent data is the first stage.
    pub fn resolve(
        &self,
        current_stage_id: Option<i64>,
        current_stage: Option<&StageRef>,
    ) -> std::result::Result<u32, StageParseError> {
        if let Some(id) = current_stage_id {
            return Ok(self.clamp(id));
        }
        let raw = match current_stage {
            None => return Ok(FIRST_STAGE),
            Some(StageRef::ById(id)) => return Ok(self.clamp(*id)),
            Some(StageRef::Embedded(EmbeddedStage { id: Some(id), .. })) => {
                return Ok(self.clamp(*id))
            }
            Some(StageRef::Embedded(EmbeddedStage {
                stage_name: Some(name),
                ..
            })) => name,
            Some(StageRef::Embedded(_)) => return Ok(FIRST_STAGE),
            Some(StageRef::ByName(name)) => name,
        };
        parse_stage_number(raw).map(|n| self.clamp(n))
    }

    /// Like [`resolve`](Self::resolve) but an unreadable stage becomes the first stage.
    pub fn resolve_or_default(
        &self,
        current_stage_id: Option<i64>,
        current_stage: Option<&StageRef>,
    ) -> u32 {
        self.resolve(current_stage_id, current_stage)
            .unwrap_or_else(|err| {
                debug!(error = %err, "stage reference unreadable, using stage {FIRST_STAGE}");
                FIRST_STAGE
            })
    }

    /// Percentage through the lifecycle; 0 for cancelled records.
    pub fn progress_percent(&self, stage: u32, cancelled: bool) -> u32 {
        if cancelled {
            return 0;
        }
        let span = (self.last_stage - FIRST_STAGE) as f64;
        if span == 0.0 {
            return 0;
        }
        let clamped = self.clamp(stage as i64);
        (((clamped - FIRST_STAGE) as f64 / span) * 100.0).round() as u32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> StageRef {
        StageRef::ByName(s.to_string())
    }

    #[test]
    fn numeric_id_wins() {
        let r = StageResolver::default();
        assert_eq!(r.resolve(Some(7), Some(&name("3. Aprobación"))).unwrap(), 7);
    }

    #[test]
    fn embedded_name_parses_leading_number() {
        let r = StageResolver::default();
        let embedded = StageRef::Embedded(EmbeddedStage {
            id: None,
            stage_name: Some("3. Aprobación".to_string()),
        });
        assert_eq!(r.resolve(None, Some(&embedded)).unwrap(), 3);
    }

    #[test]
    fn embedded_id_beats_embedded_name() {
        let r = StageResolver::default();
        let embedded = StageRef::Embedded(EmbeddedStage {
            id: Some(5),
            stage_name: Some("3. Aprobación".to_string()),
        });
        assert_eq!(r.resolve(None, Some(&embedded)).unwrap(), 5);
    }

    #[test]
    fn unreadable_name_is_an_error_or_stage_one() {
        let r = StageResolver::default();
        let bad = name("not-a-number");
        assert_eq!(
            r.resolve(None, Some(&bad)).unwrap_err().input,
            "not-a-number"
        );
        assert_eq!(r.resolve_or_default(None, Some(&bad)), 1);
    }

    #[test]
    fn missing_reference_is_stage_one() {
        let r = StageResolver::default();
        assert_eq!(r.resolve(None, None).unwrap(), 1);
        let empty = StageRef::Embedded(EmbeddedStage::default());
        assert_eq!(r.resolve(None, Some(&empty)).unwrap(), 1);
    }

    #[test]
    fn results_always_clamp_into_range() {
        let r = StageResolver::default();
        let inputs = [
            (Some(-4), None),
            (Some(0), None),
            (Some(99), None),
            (None, Some(name("42. Más allá"))),
            (None, Some(name("-3"))),
            (None, Some(StageRef::ById(i64::MAX))),
            (None, Some(name("garbage"))),
        ];
        for (id, stage) in inputs {
            let s = r.resolve_or_default(id, stage.as_ref());
            assert!((1..=11).contains(&s), "{id:?} {stage:?} resolved to {s}");
        }
    }

    #[test]
    fn lenient_leading_integer() {
        assert_eq!(parse_stage_number("  8 Certificación").unwrap(), 8);
        assert_eq!(parse_stage_number("10.Cierre").unwrap(), 10);
        assert!(parse_stage_number(". 3").is_err());
    }

    #[test]
    fn progress_percentages() {
        let r = StageResolver::default();
        assert_eq!(r.progress_percent(1, false), 0);
        assert_eq!(r.progress_percent(6, false), 50);
        assert_eq!(r.progress_percent(11, false), 100);
        assert_eq!(r.progress_percent(4, false), 30);
        assert_eq!(r.progress_percent(6, true), 0);
        assert_eq!(r.progress_percent(40, false), 100);
    }

    #[test]
    fn stage_ref_untagged_json() {
        let by_id: StageRef = serde_json::from_str("7").unwrap();
        assert_eq!(by_id, StageRef::ById(7));
        let by_name: StageRef = serde_json::from_str("\"3. Aprobación\"").unwrap();
        assert_eq!(by_name, name("3. Aprobación"));
        let embedded: StageRef =
            serde_json::from_str(r#"{"stage_name": "2. Análisis"}"#).unwrap();
        assert!(matches!(embedded, StageRef::Embedded(EmbeddedStage { id: None, .. })));
    }

    #[test]
    fn default_catalog_has_cancelled_last() {
        let catalog = StageCatalog::default();
        assert_eq!(catalog.len(), 11);
        assert_eq!(catalog.get(11).unwrap().name, "Cancelado");
        assert_eq!(catalog.get(3).unwrap().label(), "3. Aprobación");
        assert_eq!(catalog.by_name("pruebas").unwrap().id, 7);
        assert_eq!(catalog.by_name("APROBACIÓN").unwrap().id, 3);
        assert_eq!(catalog.by_name("3. Aprobación").unwrap().id, 3);
    }

    #[test]
    fn catalog_load_defaults_then_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut catalog = StageCatalog::load(dir.path()).unwrap();
        catalog.stages.truncate(2);
        catalog.save(dir.path()).unwrap();
        let loaded = StageCatalog::load(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(2).unwrap().code, "E02");
    }
}
