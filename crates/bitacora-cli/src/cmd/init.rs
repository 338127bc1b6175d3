use anyhow::Context;
use bitacora_core::{
    config::Config,
    fields::FieldRegistry,
    io, paths,
    reservation::{Reservation, Room},
    stage::StageCatalog,
};
use serde::Serialize;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing bitacora in: {}", root.display());

    for dir in [paths::BITACORA_DIR, paths::DEVELOPMENTS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    seed(root, paths::CONFIG_FILE, &Config::new(&project_name))?;
    seed(root, paths::STAGES_FILE, &StageCatalog::default())?;
    seed(root, paths::FIELDS_FILE, &FieldRegistry::default())?;
    seed(root, paths::ROOMS_FILE, &Vec::<Room>::new())?;
    seed(root, paths::RESERVATIONS_FILE, &Vec::<Reservation>::new())?;

    println!("\nbitacora initialized. Next: bitacora dev create <id> --name <name>");
    Ok(())
}

/// Write `value` as YAML at `rel` unless the file is already there.
fn seed<T: Serialize>(root: &Path, rel: &str, value: &T) -> anyhow::Result<()> {
    let data = serde_yaml::to_string(value).with_context(|| format!("failed to encode {rel}"))?;
    let created = io::write_if_missing(&root.join(rel), data.as_bytes())
        .with_context(|| format!("failed to write {rel}"))?;
    if created {
        println!("  created: {rel}");
    } else {
        println!("  exists:  {rel}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(paths::BITACORA_DIR)).unwrap();
        std::fs::write(dir.path().join(paths::FIELDS_FILE), "stages: []\n").unwrap();

        run(dir.path()).unwrap();

        let fields = std::fs::read_to_string(dir.path().join(paths::FIELDS_FILE)).unwrap();
        assert_eq!(fields, "stages: []\n");
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.lifecycle.stage_count, 11);
        assert!(dir.path().join(paths::RESERVATIONS_FILE).exists());
        assert_eq!(StageCatalog::load(dir.path()).unwrap().stages.len(), 11);
    }
}
