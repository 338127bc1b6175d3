use crate::cmd::Project;
use crate::output::{print_json, print_table};
use bitacora_core::stage::{StageRef, StageResolver};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum StageSubcommand {
    /// List the stage catalog
    List,
    /// Resolve a stage id and/or reference to a stage number and progress
    Resolve {
        /// Numeric stage id (wins over --stage)
        #[arg(long)]
        id: Option<i64>,
        /// Stage reference: a number or a name like "3. Aprobación"
        #[arg(long)]
        stage: Option<String>,
        /// Treat the record as cancelled (progress 0)
        #[arg(long)]
        cancelled: bool,
        /// Fail on an unreadable reference instead of falling back to stage 1
        #[arg(long)]
        strict: bool,
    },
}

pub fn run(root: &Path, subcmd: StageSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StageSubcommand::List => list(root, json),
        StageSubcommand::Resolve {
            id,
            stage,
            cancelled,
            strict,
        } => resolve(root, id, stage.as_deref(), cancelled, strict, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    if json {
        return print_json(&project.catalog.stages);
    }
    let rows = project
        .catalog
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.code.clone(),
                s.name.clone(),
                s.phase.clone(),
                s.estimated_days.to_string(),
                s.responsible.clone(),
                if s.milestone { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "CODE", "NAME", "PHASE", "DAYS", "RESPONSIBLE", "MILESTONE"],
        rows,
    );
    Ok(())
}

fn resolve(
    root: &Path,
    id: Option<i64>,
    stage: Option<&str>,
    cancelled: bool,
    strict: bool,
    json: bool,
) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let resolver = StageResolver::from_config(&project.config.lifecycle);
    let reference = stage.map(StageRef::parse);

    let number = if strict {
        resolver.resolve(id, reference.as_ref())?
    } else {
        resolver.resolve_or_default(id, reference.as_ref())
    };
    let progress = resolver.progress_percent(number, cancelled);
    let name = project.catalog.get(number).map(|s| s.name.clone());

    if json {
        print_json(&serde_json::json!({
            "stage": number,
            "stage_name": name,
            "progress": progress,
        }))?;
    } else {
        match name {
            Some(name) => println!("Stage {number} ({name}), {progress}% complete"),
            None => println!("Stage {number}, {progress}% complete"),
        }
    }
    Ok(())
}
