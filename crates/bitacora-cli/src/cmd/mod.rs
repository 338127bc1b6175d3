pub mod activity;
pub mod config;
pub mod development;
pub mod fields;
pub mod followup;
pub mod gantt;
pub mod import;
pub mod init;
pub mod reservation;
pub mod room;
pub mod stage;

use anyhow::Context;
use bitacora_core::{config::Config, stage::StageCatalog};
use chrono::NaiveDateTime;
use std::path::Path;

/// Configuration and stage catalog shared by the lifecycle commands.
pub struct Project {
    pub config: Config,
    pub catalog: StageCatalog,
}

impl Project {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let catalog = StageCatalog::load(root).context("failed to load stage catalog")?;
        Ok(Self { config, catalog })
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Clap parser for `YYYY-MM-DD HH:MM` (a `T` separator and seconds are accepted).
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
        .ok_or_else(|| format!("'{s}' is not a date-time like 2024-06-10 09:30"))
}

/// Clap parser for `key=value` pairs.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not in key=value form"))?;
    let k = k.trim();
    if k.is_empty() {
        return Err(format!("'{s}' has an empty key"));
    }
    Ok((k.to_string(), v.trim().to_string()))
}
