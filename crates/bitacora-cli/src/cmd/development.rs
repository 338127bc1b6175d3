use crate::cmd::Project;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use bitacora_core::{
    activity::ActivityLog,
    development::{Development, DevelopmentUpdate},
    filter::DevelopmentFilter,
    stage::StageRef,
};
use chrono::Local;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum DevSubcommand {
    /// Register a new development
    Create {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// General status (default: activo)
        #[arg(long)]
        status: Option<String>,
        /// Current stage: a number or a name like "3. Aprobación"
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
    },
    /// List developments, ordered by stage then name
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        stage: Option<u32>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
        /// Substring of the id, name or description
        #[arg(long)]
        search: Option<String>,
        /// Include cancelled developments
        #[arg(long)]
        all: bool,
    },
    /// Show a development with its activities
    Show { id: String },
    /// Change fields of a development
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Move to this stage number
        #[arg(long)]
        stage: Option<u32>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: DevSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DevSubcommand::Create {
            id,
            name,
            description,
            status,
            stage,
            provider,
            responsible,
        } => {
            let mut dev = Development::new(&id, name);
            dev.description = description;
            dev.provider = provider;
            dev.responsible = responsible;
            if let Some(status) = status {
                dev.status = status;
            }
            match stage.as_deref().map(StageRef::parse) {
                Some(StageRef::ById(n)) => dev.current_stage_id = Some(n),
                other => dev.current_stage = other,
            }
            create(root, dev, json)
        }
        DevSubcommand::List {
            status,
            stage,
            provider,
            responsible,
            search,
            all,
        } => list(
            root,
            DevelopmentFilter {
                status,
                stage,
                provider,
                responsible,
                search,
                include_cancelled: all,
            },
            json,
        ),
        DevSubcommand::Show { id } => show(root, &id, json),
        DevSubcommand::Update {
            id,
            name,
            description,
            status,
            stage,
            provider,
            responsible,
        } => update(
            root,
            &id,
            DevelopmentUpdate {
                name,
                description,
                status,
                stage_id: stage,
                provider,
                responsible,
            },
            json,
        ),
    }
}

fn create(root: &Path, dev: Development, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let dev = Development::create(root, dev)
        .context("failed to create development")?;
    let summary = dev.summarize(&project.config.lifecycle, &project.catalog);
    if json {
        print_json(&summary)?;
    } else {
        println!("Created development '{}' at stage {}", summary.id, summary.stage);
    }
    Ok(())
}

fn list(root: &Path, filter: DevelopmentFilter, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let lifecycle = &project.config.lifecycle;
    let devs = Development::list(root).context("failed to list developments")?;
    let summaries: Vec<_> = filter
        .apply(&devs, lifecycle)
        .into_iter()
        .map(|d| d.summarize(lifecycle, &project.catalog))
        .collect();

    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No developments.");
        return Ok(());
    }
    let rows = summaries
        .into_iter()
        .map(|s| {
            vec![
                s.id,
                s.name,
                format!("{}. {}", s.stage, s.stage_name.unwrap_or_default()),
                format!("{}%", s.progress),
                s.status,
                or_dash(s.provider),
                or_dash(s.responsible),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "STAGE", "PROGRESS", "STATUS", "PROVIDER", "RESPONSIBLE"],
        rows,
    );
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let dev = Development::load(root, id).with_context(|| format!("development '{id}' not found"))?;
    let log = ActivityLog::load(root, id).context("failed to load activities")?;
    let summary = dev.summarize(&project.config.lifecycle, &project.catalog);
    let today = Local::now().date_naive();
    let due: Vec<u64> = log.due_follow_ups(today).iter().map(|d| d.activity.id).collect();

    if json {
        return print_json(&serde_json::json!({
            "development": summary,
            "description": dev.description,
            "activities": log.activities,
            "due_follow_ups": due,
        }));
    }

    println!("Development: {} ({})", dev.name, dev.id);
    println!("Status:      {}", dev.status);
    println!(
        "Stage:       {}. {}",
        summary.stage,
        summary.stage_name.as_deref().unwrap_or("-")
    );
    println!("Progress:    {}%", summary.progress);
    println!("Provider:    {}", or_dash(dev.provider.as_deref()));
    println!("Responsible: {}", or_dash(dev.responsible.as_deref()));
    if let Some(desc) = &dev.description {
        println!("\n{desc}");
    }

    println!("\nActivities ({}):", log.activities.len());
    for a in &log.activities {
        let marker = if due.contains(&a.id) { "  [follow-up due]" } else { "" };
        println!(
            "  [{}] {} {} / {} ({}) from {}{}",
            a.id, a.stage_name, a.activity_type, a.actor_type, a.status, a.start_date, marker
        );
    }
    Ok(())
}

fn update(root: &Path, id: &str, update: DevelopmentUpdate, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let mut dev =
        Development::load(root, id).with_context(|| format!("development '{id}' not found"))?;
    dev.apply(update, &project.catalog)?;
    dev.save(root).context("failed to save development")?;

    let summary = dev.summarize(&project.config.lifecycle, &project.catalog);
    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Updated development '{}' (stage {}, {}%)",
            summary.id, summary.stage, summary.progress
        );
    }
    Ok(())
}
