use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

/// Extra payload fields an activity must (or may) carry while logged
/// against a given stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFields {
    pub stage_id: u32,
    #[serde(default)]
    pub required: Vec<FieldSpec>,
    #[serde(default)]
    pub optional: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRegistry {
    #[serde(default)]
    pub stages: Vec<StageFields>,
}

impl FieldRegistry {
    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_yaml_or_default(&paths::fields_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::fields_path(root), self)
    }

    pub fn for_stage(&self, stage_id: u32) -> Option<&StageFields> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    pub fn required_for(&self, stage_id: u32) -> &[FieldSpec] {
        self.for_stage(stage_id)
            .map(|s| s.required.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the field lists for one stage.
    pub fn set(&mut self, fields: StageFields) {
        self.stages.retain(|s| s.stage_id != fields.stage_id);
        self.stages.push(fields);
        self.stages.sort_by_key(|s| s.stage_id);
    }
}
