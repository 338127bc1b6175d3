use crate::cmd::Project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use bitacora_core::{
    activity::ActivityLog,
    development::Development,
    followup::{
        compute_next_follow_up, next_occurrence_on_or_after, validate_follow_up, FollowUpConfig,
        FollowUpRule,
    },
};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum FollowUpSubcommand {
    /// Compute the follow-up date for a rule and a pair of dates
    Compute {
        /// before_start, after_start, before_end or after_end
        #[arg(long)]
        rule: FollowUpRule,
        /// Days before the base date (before_* rules)
        #[arg(long)]
        days: Option<u32>,
        /// Repeat interval in days (after_* rules)
        #[arg(long)]
        interval: Option<u32>,
        /// Last day a recurring follow-up may fire
        #[arg(long)]
        until: Option<NaiveDate>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Also report the next occurrence on or after this day
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// List open activities whose follow-up is due, across all developments
    Due {
        /// Reference day (default: today)
        #[arg(long)]
        on: Option<NaiveDate>,
    },
}

pub fn run(root: &Path, subcmd: FollowUpSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FollowUpSubcommand::Compute {
            rule,
            days,
            interval,
            until,
            start,
            end,
            today,
        } => {
            let cfg = FollowUpConfig {
                enabled: true,
                rule: Some(rule),
                days,
                interval,
                until,
            };
            compute(root, &cfg, start, end, today, json)
        }
        FollowUpSubcommand::Due { on } => {
            let day = on.unwrap_or_else(|| Local::now().date_naive());
            due(root, day, json)
        }
    }
}

fn compute(
    root: &Path,
    cfg: &FollowUpConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    // The cutoff requirement is a project setting; outside a project it is off.
    let require_cutoff = Project::load(root)
        .map(|p| p.config.follow_up.require_cutoff)
        .unwrap_or(false);
    let problems = validate_follow_up(cfg, start, end, require_cutoff);
    let first = compute_next_follow_up(cfg, start, end);
    let upcoming = today.and_then(|t| next_occurrence_on_or_after(cfg, start, end, t));

    if json {
        print_json(&serde_json::json!({
            "rule": cfg.describe(),
            "next_follow_up_at": first,
            "next_on_or_after": upcoming,
            "problems": problems,
        }))?;
    } else {
        println!("Rule:        {}", cfg.describe());
        match first {
            Some(d) => println!("First:       {d}"),
            None => println!("First:       none"),
        }
        if let Some(t) = today {
            match upcoming {
                Some(d) => println!("Next >= {t}: {d}"),
                None => println!("Next >= {t}: none"),
            }
        }
        for p in &problems {
            println!("[warning] {p}");
        }
    }
    Ok(())
}

fn due(root: &Path, day: NaiveDate, json: bool) -> anyhow::Result<()> {
    Project::load(root)?;
    let devs = Development::list(root).context("failed to list developments")?;
    let mut entries = Vec::new();
    for dev in &devs {
        let log = ActivityLog::load(root, &dev.id)
            .with_context(|| format!("failed to load activities of '{}'", dev.id))?;
        entries.extend(log.due_follow_ups(day));
    }
    entries.sort_by(|a, b| {
        (a.due_on, &a.activity.development_id, a.activity.id)
            .cmp(&(b.due_on, &b.activity.development_id, b.activity.id))
    });

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No follow-ups due on or before {day}.");
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            let a = &e.activity;
            vec![
                e.due_on.to_string(),
                a.development_id.clone(),
                a.id.to_string(),
                a.stage_name.clone(),
                a.status.to_string(),
            ]
        })
        .collect();
    print_table(&["DUE", "DEVELOPMENT", "ACTIVITY", "STAGE", "STATUS"], rows);
    Ok(())
}
