//! Spreadsheet import of development records from delimited files.

use crate::config::ImportConfig;
use crate::development::Development;
use crate::error::{BitacoraError, Result};
use crate::paths;
use crate::stage::StageRef;
use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub type ImportRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    /// Target field names, in spreadsheet column order.
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
    pub skipped_blank: usize,
    pub skipped_missing_id: usize,
    pub preview_limit: usize,
    pub warnings: Vec<String>,
}

impl ImportPreview {
    /// The rows shown before the user confirms the import.
    pub fn preview(&self) -> &[ImportRow] {
        &self.rows[..self.rows.len().min(self.preview_limit)]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub created: Vec<String>,
    pub skipped_existing: Vec<String>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub id: String,
    pub reason: String,
}

fn classify(err: csv::Error) -> BitacoraError {
    match err.kind() {
        ErrorKind::Io(e) => BitacoraError::ImportUnreadable(e.to_string()),
        _ => BitacoraError::ImportUnparseable(err.to_string()),
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Open and parse a spreadsheet file.
pub fn read_spreadsheet(path: &Path, cfg: &ImportConfig) -> Result<ImportPreview> {
    let file = std::fs::File::open(path)
        .map_err(|e| BitacoraError::ImportUnreadable(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "reading spreadsheet");
    parse_spreadsheet(file, cfg)
}

/// Parse delimited content. Leading blank rows are skipped, the first
/// non-blank row is the header, and rows without an identifier are dropped.
pub fn parse_spreadsheet<R: Read>(reader: R, cfg: &ImportConfig) -> Result<ImportPreview> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = rdr.records();
    let mut skipped_blank = 0;

    let header = loop {
        match records.next() {
            Some(rec) => {
                let rec = rec.map_err(classify)?;
                if is_blank(&rec) {
                    skipped_blank += 1;
                    continue;
                }
                break rec;
            }
            None => {
                return Err(BitacoraError::ImportUnparseable(
                    "no header row found".to_string(),
                ))
            }
        }
    };

    let headers: Vec<String> = header.iter().map(|h| cfg.target_for(h)).collect();
    let mut warnings = Vec::new();
    if !headers.iter().any(|h| h == &cfg.id_column) {
        warnings.push(format!(
            "identifier column '{}' not found; every row will be skipped",
            cfg.id_column
        ));
    }

    let mut rows = Vec::new();
    let mut skipped_missing_id = 0;
    for rec in records {
        let rec = rec.map_err(classify)?;
        if is_blank(&rec) {
            skipped_blank += 1;
            continue;
        }
        let row: ImportRow = headers
            .iter()
            .zip(rec.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        let has_id = row
            .get(&cfg.id_column)
            .is_some_and(|v| !v.trim().is_empty());
        if !has_id {
            skipped_missing_id += 1;
            continue;
        }
        rows.push(row);
    }

    debug!(
        rows = rows.len(),
        skipped_blank, skipped_missing_id, "spreadsheet parsed"
    );
    Ok(ImportPreview {
        headers,
        rows,
        skipped_blank,
        skipped_missing_id,
        preview_limit: cfg.preview_limit,
        warnings,
    })
}

fn non_empty(row: &ImportRow, key: &str) -> Option<String> {
    row.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn row_to_development(row: &ImportRow, id: &str) -> Development {
    let name = non_empty(row, "name").unwrap_or_else(|| id.to_string());
    let mut dev = Development::new(id, name);
    if let Some(status) = non_empty(row, "status") {
        dev.status = status;
    }
    dev.description = non_empty(row, "description");
    dev.provider = non_empty(row, "provider");
    dev.responsible = non_empty(row, "responsible");
    match non_empty(row, "stage").map(|s| StageRef::parse(&s)) {
        Some(StageRef::ById(n)) => dev.current_stage_id = Some(n),
        other => dev.current_stage = other,
    }
    dev
}

/// Store every previewed row as a development. Existing ids are left alone.
pub fn commit(root: &Path, preview: &ImportPreview, cfg: &ImportConfig) -> Result<ImportOutcome> {
    let mut outcome = ImportOutcome::default();
    for row in &preview.rows {
        let Some(id) = non_empty(row, &cfg.id_column) else {
            continue;
        };
        if let Err(e) = paths::validate_id(&id) {
            warn!(id = %id, "rejecting imported row");
            outcome.rejected.push(RejectedRow {
                id,
                reason: e.to_string(),
            });
            continue;
        }
        if Development::exists(root, &id) {
            outcome.skipped_existing.push(id);
            continue;
        }
        Development::create(root, row_to_development(row, &id))?;
        outcome.created.push(id);
    }
    info!(
        created = outcome.created.len(),
        skipped = outcome.skipped_existing.len(),
        rejected = outcome.rejected.len(),
        "import committed"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecycleConfig;
    use crate::stage::StageResolver;
    use tempfile::TempDir;

    const SHEET: &str = "\
,,,
 , ,,
ID,Nombre,Etapa,Proveedor,Observaciones
DEV-1,Portal,3. Aprobación,Acme,urgent
,Sin id,2,,
DEV-2,Billing,6,Globex,
,,,,
DEV-3,,,,
";

    #[test]
    fn headers_are_mapped_and_blank_rows_skipped() {
        let preview = parse_spreadsheet(SHEET.as_bytes(), &ImportConfig::default()).unwrap();
        assert_eq!(
            preview.headers,
            vec!["id", "name", "stage", "provider", "Observaciones"]
        );
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.skipped_blank, 3);
        assert_eq!(preview.skipped_missing_id, 1);
        assert_eq!(preview.rows[0]["name"], "Portal");
        assert_eq!(preview.rows[0]["Observaciones"], "urgent");
        assert!(preview.warnings.is_empty());
    }

    #[test]
    fn preview_is_capped() {
        let cfg = ImportConfig {
            preview_limit: 2,
            ..ImportConfig::default()
        };
        let preview = parse_spreadsheet(SHEET.as_bytes(), &cfg).unwrap();
        assert_eq!(preview.preview().len(), 2);
        assert_eq!(preview.rows.len(), 3);
    }

    #[test]
    fn empty_input_is_unparseable() {
        let err = parse_spreadsheet("\n ,\n".as_bytes(), &ImportConfig::default()).unwrap_err();
        assert!(matches!(err, BitacoraError::ImportUnparseable(_)));
    }

    #[test]
    fn invalid_utf8_is_unparseable() {
        let bytes: &[u8] = b"ID,Nombre\nDEV-1,\xff\xfe\n";
        let err = parse_spreadsheet(bytes, &ImportConfig::default()).unwrap_err();
        assert!(matches!(err, BitacoraError::ImportUnparseable(_)));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = read_spreadsheet(&dir.path().join("nope.csv"), &ImportConfig::default())
            .unwrap_err();
        assert!(matches!(err, BitacoraError::ImportUnreadable(_)));
    }

    #[test]
    fn missing_id_column_warns_and_skips_everything() {
        let preview =
            parse_spreadsheet("Nombre\nPortal\n".as_bytes(), &ImportConfig::default()).unwrap();
        assert!(preview.rows.is_empty());
        assert_eq!(preview.skipped_missing_id, 1);
        assert_eq!(preview.warnings.len(), 1);
    }

    #[test]
    fn commit_creates_and_skips_existing() {
        let dir = TempDir::new().unwrap();
        let cfg = ImportConfig::default();
        Development::create(dir.path(), Development::new("DEV-2", "Existing")).unwrap();

        let preview = parse_spreadsheet(SHEET.as_bytes(), &cfg).unwrap();
        let outcome = commit(dir.path(), &preview, &cfg).unwrap();
        assert_eq!(outcome.created, vec!["DEV-1", "DEV-3"]);
        assert_eq!(outcome.skipped_existing, vec!["DEV-2"]);

        let resolver = StageResolver::from_config(&LifecycleConfig::default());
        let dev1 = Development::load(dir.path(), "DEV-1").unwrap();
        assert_eq!(dev1.stage_index(&resolver), 3);
        assert_eq!(dev1.provider.as_deref(), Some("Acme"));
        let dev3 = Development::load(dir.path(), "DEV-3").unwrap();
        assert_eq!(dev3.name, "DEV-3");
        assert_eq!(dev3.stage_index(&resolver), 1);
    }

    #[test]
    fn commit_rejects_unsafe_ids() {
        let dir = TempDir::new().unwrap();
        let cfg = ImportConfig::default();
        let preview = parse_spreadsheet("ID,Nombre\n../etc,Bad\n".as_bytes(), &cfg).unwrap();
        let outcome = commit(dir.path(), &preview, &cfg).unwrap();
        assert!(outcome.created.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id, "../etc");
    }
}
