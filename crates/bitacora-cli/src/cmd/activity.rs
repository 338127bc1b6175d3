use crate::cmd::{parse_key_value, Project};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use bitacora_core::{
    activity::{Activity, ActivityLog, NewActivity},
    error::BitacoraError,
    fields::FieldRegistry,
    followup::{FollowUpConfig, FollowUpRule},
    stage::StageCatalog,
    types::{ActivityStatus, ActivityType, ActorType},
    wizard::{ActivityDraft, Wizard},
};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Subcommand)]
pub enum ActivitySubcommand {
    /// Log a new activity (runs the three wizard steps)
    Add {
        development: String,
        #[command(flatten)]
        form: ActivityForm,
    },
    /// List activities of a development
    List {
        development: String,
        /// Only activities of this stage
        #[arg(long)]
        stage: Option<u32>,
    },
    /// Edit an activity; unspecified fields keep their values
    Edit {
        development: String,
        id: u64,
        #[command(flatten)]
        form: ActivityForm,
    },
    /// Change only the status of an activity
    Status {
        development: String,
        id: u64,
        status: ActivityStatus,
    },
    /// Delete an activity
    Delete { development: String, id: u64 },
}

/// Wizard fields as flags. Step 1: stage, type, actor, status, start.
/// Step 2: end date and follow-up. Step 3: stage fields.
#[derive(Args, Debug, Default)]
pub struct ActivityForm {
    /// Stage number
    #[arg(long)]
    stage: Option<u32>,
    /// nueva_actividad, seguimiento, cierre_etapa or cancelacion
    #[arg(long = "type", value_name = "TYPE")]
    activity_type: Option<ActivityType>,
    /// equipo_interno, proveedor, usuario or gerencia
    #[arg(long)]
    actor: Option<ActorType>,
    /// pendiente, en_curso, completada or cancelada
    #[arg(long)]
    status: Option<ActivityStatus>,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Follow-up rule: before_start, after_start, before_end or after_end
    #[arg(long = "follow-up", value_name = "RULE")]
    follow_up: Option<FollowUpRule>,
    /// Days before the base date (before_* rules)
    #[arg(long)]
    days: Option<u32>,
    /// Repeat interval in days (after_* rules)
    #[arg(long)]
    interval: Option<u32>,
    /// Last day a recurring follow-up may fire
    #[arg(long)]
    until: Option<NaiveDate>,
    /// Turn follow-ups off
    #[arg(long, conflicts_with = "follow_up")]
    no_follow_up: bool,
    #[arg(long)]
    notes: Option<String>,
    /// Stage field value as key=value (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,
}

impl ActivityForm {
    fn apply(self, draft: &mut ActivityDraft, catalog: &StageCatalog) -> anyhow::Result<()> {
        if let Some(stage_id) = self.stage {
            let stage = catalog
                .get(stage_id)
                .ok_or_else(|| BitacoraError::StageNotFound(stage_id.to_string()))?;
            draft.stage_id = Some(stage_id);
            draft.stage_name = Some(stage.name.clone());
        }
        if self.activity_type.is_some() {
            draft.activity_type = self.activity_type;
        }
        if self.actor.is_some() {
            draft.actor_type = self.actor;
        }
        if self.status.is_some() {
            draft.status = self.status;
        }
        if self.start.is_some() {
            draft.start_date = self.start;
        }
        if self.end.is_some() {
            draft.end_date = self.end;
        }

        if self.no_follow_up {
            draft.follow_up = FollowUpConfig::default();
        }
        if let Some(rule) = self.follow_up {
            draft.follow_up.enabled = true;
            draft.follow_up.rule = Some(rule);
        }
        if self.days.is_some() {
            draft.follow_up.days = self.days;
        }
        if self.interval.is_some() {
            draft.follow_up.interval = self.interval;
        }
        if self.until.is_some() {
            draft.follow_up.until = self.until;
        }

        if self.notes.is_some() {
            draft.notes = self.notes;
        }
        draft.payload.extend(self.fields);
        Ok(())
    }
}

pub fn run(root: &Path, subcmd: ActivitySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActivitySubcommand::Add { development, form } => add(root, &development, form, json),
        ActivitySubcommand::List { development, stage } => list(root, &development, stage, json),
        ActivitySubcommand::Edit {
            development,
            id,
            form,
        } => edit(root, &development, id, form, json),
        ActivitySubcommand::Status {
            development,
            id,
            status,
        } => set_status(root, &development, id, status, json),
        ActivitySubcommand::Delete { development, id } => delete(root, &development, id, json),
    }
}

/// Walk the wizard forward step by step, stopping at the first step that
/// does not validate.
fn complete_wizard(mut wizard: Wizard, catalog: &StageCatalog) -> anyhow::Result<NewActivity> {
    while wizard.step().next().is_some() {
        let step = wizard.step();
        wizard
            .next()
            .with_context(|| format!("step {step} is incomplete"))?;
    }
    let step = wizard.step();
    wizard
        .finish(catalog)
        .with_context(|| format!("step {step} is incomplete"))
}

fn wizard_for(root: &Path, project: &Project, draft: ActivityDraft) -> anyhow::Result<Wizard> {
    let fields = FieldRegistry::load(root).context("failed to load stage fields")?;
    Ok(Wizard::with_draft(
        draft,
        fields,
        project.config.follow_up.require_cutoff,
    ))
}

fn print_activity(verb: &str, a: &Activity, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(a)?;
    } else {
        println!("{verb} activity [{}] on '{}'", a.id, a.development_id);
        if let Some(next) = a.next_follow_up_at {
            println!("  next follow-up: {next}");
        }
    }
    Ok(())
}

fn add(root: &Path, development: &str, form: ActivityForm, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let mut log = ActivityLog::load(root, development)
        .with_context(|| format!("cannot log activities on '{development}'"))?;

    let mut draft = ActivityDraft::default();
    form.apply(&mut draft, &project.catalog)?;
    let new = complete_wizard(wizard_for(root, &project, draft)?, &project.catalog)?;

    let activity = log.add(new).clone();
    log.save(root).context("failed to save activities")?;
    print_activity("Logged", &activity, json)
}

fn list(root: &Path, development: &str, stage: Option<u32>, json: bool) -> anyhow::Result<()> {
    let log = ActivityLog::load(root, development)
        .with_context(|| format!("cannot list activities of '{development}'"))?;
    let activities: Vec<&Activity> = match stage {
        Some(s) => log.for_stage(s).collect(),
        None => log.activities.iter().collect(),
    };

    if json {
        return print_json(&activities);
    }
    if activities.is_empty() {
        println!("No activities.");
        return Ok(());
    }
    let rows = activities
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                format!("{}. {}", a.stage_id, a.stage_name),
                a.activity_type.to_string(),
                a.actor_type.to_string(),
                a.status.to_string(),
                a.start_date.to_string(),
                or_dash(a.end_date),
                or_dash(a.next_follow_up_at),
            ]
        })
        .collect();
    print_table(
        &["ID", "STAGE", "TYPE", "ACTOR", "STATUS", "START", "END", "FOLLOW-UP"],
        rows,
    );
    Ok(())
}

fn edit(
    root: &Path,
    development: &str,
    id: u64,
    form: ActivityForm,
    json: bool,
) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let mut log = ActivityLog::load(root, development)
        .with_context(|| format!("cannot edit activities of '{development}'"))?;

    let mut draft = ActivityDraft::from_activity(log.get(id)?);
    form.apply(&mut draft, &project.catalog)?;
    let new = complete_wizard(wizard_for(root, &project, draft)?, &project.catalog)?;

    let activity = log.update(id, new)?.clone();
    log.save(root).context("failed to save activities")?;
    print_activity("Updated", &activity, json)
}

fn set_status(
    root: &Path,
    development: &str,
    id: u64,
    status: ActivityStatus,
    json: bool,
) -> anyhow::Result<()> {
    let mut log = ActivityLog::load(root, development)
        .with_context(|| format!("cannot edit activities of '{development}'"))?;
    let activity = log.set_status(id, status)?.clone();
    log.save(root).context("failed to save activities")?;
    print_activity("Updated", &activity, json)
}

fn delete(root: &Path, development: &str, id: u64, json: bool) -> anyhow::Result<()> {
    let mut log = ActivityLog::load(root, development)
        .with_context(|| format!("cannot delete activities of '{development}'"))?;
    log.remove(id)?;
    log.save(root).context("failed to save activities")?;

    if json {
        print_json(&serde_json::json!({
            "development": development,
            "id": id,
            "deleted": true,
        }))?;
    } else {
        println!("Deleted activity [{id}] from '{development}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn form_fills_draft_and_stage_name() {
        let catalog = StageCatalog::default();
        let form = ActivityForm {
            stage: Some(3),
            follow_up: Some(FollowUpRule::BeforeStart),
            days: Some(2),
            fields: vec![("quote".to_string(), "1200".to_string())],
            ..Default::default()
        };
        let mut draft = ActivityDraft::default();
        form.apply(&mut draft, &catalog).unwrap();
        assert_eq!(draft.stage_id, Some(3));
        assert_eq!(draft.stage_name.as_deref(), Some("Aprobación"));
        assert!(draft.follow_up.enabled);
        assert_eq!(draft.payload["quote"], "1200");
    }

    #[test]
    fn unknown_stage_rejected() {
        let form = ActivityForm {
            stage: Some(42),
            ..Default::default()
        };
        let mut draft = ActivityDraft::default();
        assert!(form.apply(&mut draft, &StageCatalog::default()).is_err());
    }

    #[test]
    fn no_follow_up_clears_existing_config() {
        let mut draft = ActivityDraft {
            follow_up: FollowUpConfig::before(FollowUpRule::BeforeEnd, 3),
            ..Default::default()
        };
        let form = ActivityForm {
            no_follow_up: true,
            ..Default::default()
        };
        form.apply(&mut draft, &StageCatalog::default()).unwrap();
        assert_eq!(draft.follow_up, FollowUpConfig::default());
    }

    #[test]
    fn wizard_stops_at_first_incomplete_step() {
        let draft = ActivityDraft {
            stage_id: Some(2),
            activity_type: Some(ActivityType::NewActivity),
            actor_type: Some(ActorType::Provider),
            status: Some(ActivityStatus::Pending),
            start_date: Some(d("2024-06-10")),
            end_date: Some(d("2024-06-01")),
            ..Default::default()
        };
        let wizard = Wizard::with_draft(draft, FieldRegistry::default(), false);
        let err = complete_wizard(wizard, &StageCatalog::default()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("step 2. "), "{msg}");
        assert!(msg.contains("End date must be on or after the start date"), "{msg}");
    }
}
