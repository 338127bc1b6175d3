use crate::cmd::Project;
use crate::output::print_json;
use anyhow::Context;
use bitacora_core::{
    activity::ActivityLog,
    development::Development,
    gantt::{compose, render_text},
    stage::{Stage, StageResolver},
};
use chrono::{Local, NaiveDate};
use std::path::Path;

pub fn run(
    root: &Path,
    id: &str,
    today: Option<NaiveDate>,
    width: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let dev = Development::load(root, id).with_context(|| format!("development '{id}' not found"))?;
    let log = ActivityLog::load(root, id).context("failed to load activities")?;

    let resolver = StageResolver::from_config(&project.config.lifecycle);
    let current = dev.stage_index(&resolver);
    let stages: Vec<Stage> = project.catalog.iter().cloned().collect();
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let chart = compose(
        &log.activities,
        &stages,
        Some(current),
        today,
        &project.config.gantt,
    );

    if json {
        return print_json(&chart);
    }
    println!("{} ({})", dev.name, dev.id);
    print!(
        "{}",
        render_text(&chart, width.unwrap_or(project.config.gantt.bar_width))
    );
    Ok(())
}
