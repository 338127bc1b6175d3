use crate::cmd::Project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use bitacora_core::import::{commit, read_spreadsheet, ImportPreview};
use std::path::Path;

pub fn run(root: &Path, file: &Path, do_commit: bool, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let cfg = &project.config.import;
    let preview = read_spreadsheet(file, cfg)
        .with_context(|| format!("failed to import {}", file.display()))?;

    if !do_commit {
        return print_preview(&preview, json);
    }

    let outcome = commit(root, &preview, cfg).context("failed to store imported developments")?;
    if json {
        print_json(&serde_json::json!({
            "preview": preview,
            "outcome": outcome,
        }))?;
    } else {
        for w in &preview.warnings {
            println!("[warning] {w}");
        }
        println!(
            "Imported {} development(s); {} already existed, {} rejected",
            outcome.created.len(),
            outcome.skipped_existing.len(),
            outcome.rejected.len()
        );
        for r in &outcome.rejected {
            println!("  rejected {}: {}", r.id, r.reason);
        }
    }
    Ok(())
}

fn print_preview(preview: &ImportPreview, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(preview);
    }
    for w in &preview.warnings {
        println!("[warning] {w}");
    }
    let headers: Vec<&str> = preview.headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = preview
        .preview()
        .iter()
        .map(|row| {
            preview
                .headers
                .iter()
                .map(|h| row.get(h).cloned().unwrap_or_default())
                .collect::<Vec<String>>()
        })
        .collect();
    print_table(&headers, rows);
    println!(
        "\n{} row(s) ready, showing {}; skipped {} blank and {} without id",
        preview.rows.len(),
        preview.preview().len(),
        preview.skipped_blank,
        preview.skipped_missing_id
    );
    println!("Run again with --commit to store them.");
    Ok(())
}
