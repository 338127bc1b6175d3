use crate::error::{BitacoraError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BITACORA_DIR: &str = ".bitacora";
pub const DEVELOPMENTS_DIR: &str = ".bitacora/developments";

pub const CONFIG_FILE: &str = ".bitacora/config.yaml";
pub const STAGES_FILE: &str = ".bitacora/stages.yaml";
pub const FIELDS_FILE: &str = ".bitacora/fields.yaml";
pub const ROOMS_FILE: &str = ".bitacora/rooms.yaml";
pub const RESERVATIONS_FILE: &str = ".bitacora/reservations.yaml";

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const ACTIVITIES_FILE: &str = "activities.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn development_dir(root: &Path, id: &str) -> PathBuf {
    root.join(DEVELOPMENTS_DIR).join(id)
}

pub fn development_manifest(root: &Path, id: &str) -> PathBuf {
    development_dir(root, id).join(MANIFEST_FILE)
}

pub fn activities_path(root: &Path, id: &str) -> PathBuf {
    development_dir(root, id).join(ACTIVITIES_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn stages_path(root: &Path) -> PathBuf {
    root.join(STAGES_FILE)
}

pub fn fields_path(root: &Path) -> PathBuf {
    root.join(FIELDS_FILE)
}

pub fn rooms_path(root: &Path) -> PathBuf {
    root.join(ROOMS_FILE)
}

pub fn reservations_path(root: &Path) -> PathBuf {
    root.join(RESERVATIONS_FILE)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").unwrap())
}

/// Development and room ids double as directory names, so they are kept to a
/// filesystem-safe alphabet.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(BitacoraError::InvalidId(id.to_string()));
    }
    Ok(())
}
