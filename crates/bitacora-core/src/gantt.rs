//! Timeline composition: logged activities and planned stage placeholders
//! merged into one list of positioned bars.

use crate::activity::Activity;
use crate::config::GanttConfig;
use crate::stage::Stage;
use crate::types::{same_text, ActivityStatus};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GanttStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl From<ActivityStatus> for GanttStatus {
    fn from(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::Completed => GanttStatus::Completed,
            ActivityStatus::InProgress => GanttStatus::InProgress,
            ActivityStatus::Cancelled => GanttStatus::Cancelled,
            ActivityStatus::Pending => GanttStatus::Pending,
        }
    }
}

impl GanttStatus {
    fn glyph(self) -> char {
        match self {
            GanttStatus::Completed => '#',
            GanttStatus::InProgress => '=',
            GanttStatus::Pending => '-',
            GanttStatus::Cancelled => 'x',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GanttSource {
    Activity { id: u64 },
    Stage { id: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttItem {
    pub source: GanttSource,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: i64,
    pub status: GanttStatus,
    pub responsible: String,
    pub milestone: bool,
    pub phase: String,
    pub left_percent: f64,
    pub width_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttChart {
    pub items: Vec<GanttItem>,
    /// `None` when there is nothing to draw.
    pub window: Option<TimeWindow>,
}

impl GanttChart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn stage_matches(stage: &Stage, stage_name: &str) -> bool {
    same_text(&stage.name, stage_name) || same_text(&stage.label(), stage_name)
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64)).unwrap_or(date)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs())).unwrap_or(date)
    }
}

fn activity_item(activity: &Activity, stages: &[Stage]) -> GanttItem {
    let stage = stages
        .iter()
        .find(|s| s.id == activity.stage_id || stage_matches(s, &activity.stage_name));
    let start = activity.start_date;
    let end = activity
        .end_date
        .unwrap_or_else(|| add_days(start, 1))
        .max(start);
    GanttItem {
        source: GanttSource::Activity { id: activity.id },
        label: format!("{} / {}", activity.stage_name, activity.activity_type),
        start,
        end,
        duration_days: (end - start).num_days(),
        status: activity.status.into(),
        responsible: activity.actor_type.to_string(),
        milestone: stage.is_some_and(|s| s.milestone),
        phase: stage.map(|s| s.phase.clone()).unwrap_or_default(),
        left_percent: 0.0,
        width_percent: 0.0,
    }
}

fn stage_item(stage: &Stage, current_stage_id: Option<u32>, today: NaiveDate) -> GanttItem {
    let duration = i64::from(stage.estimated_days);
    let status = if current_stage_id == Some(stage.id) {
        GanttStatus::InProgress
    } else {
        GanttStatus::Pending
    };
    GanttItem {
        source: GanttSource::Stage { id: stage.id },
        label: stage.label(),
        start: today,
        end: add_days(today, duration),
        duration_days: duration,
        status,
        responsible: stage.responsible.clone(),
        milestone: stage.milestone,
        phase: stage.phase.clone(),
        left_percent: 0.0,
        width_percent: 0.0,
    }
}

/// Merge activities and the stages that have none into one timeline.
///
/// Stages are matched to activities by name. Unmatched stages become
/// placeholders starting `today` and lasting their estimated days.
pub fn compose(
    activities: &[Activity],
    stages: &[Stage],
    current_stage_id: Option<u32>,
    today: NaiveDate,
    cfg: &GanttConfig,
) -> GanttChart {
    let mut items: Vec<GanttItem> = activities
        .iter()
        .map(|a| activity_item(a, stages))
        .collect();
    items.extend(
        stages
            .iter()
            .filter(|s| !activities.iter().any(|a| stage_matches(s, &a.stage_name)))
            .map(|s| stage_item(s, current_stage_id, today)),
    );

    if items.is_empty() {
        return GanttChart {
            items,
            window: None,
        };
    }

    items.sort_by_key(|i| i.start);

    let earliest = items.iter().map(|i| i.start.min(i.end)).min().unwrap_or(today);
    let latest = items.iter().map(|i| i.start.max(i.end)).max().unwrap_or(today);
    let padding = i64::from(cfg.padding_days);
    let start = add_days(earliest, -padding);
    let end = add_days(latest, padding);
    let total_days = (end - start).num_days().max(1);
    let total = total_days as f64;

    for item in &mut items {
        item.left_percent = (item.start - start).num_days() as f64 / total * 100.0;
        item.width_percent = (item.duration_days as f64 / total * 100.0).max(cfg.min_width_percent);
    }

    GanttChart {
        items,
        window: Some(TimeWindow {
            start,
            end,
            total_days,
        }),
    }
}

/// Plain-text rendering: one row per item with a bar scaled to `width` columns.
pub fn render_text(chart: &GanttChart, width: usize) -> String {
    let Some(window) = chart.window else {
        return "No activities or stages to display.\n".to_string();
    };
    let width = width.max(10);
    let label_width = chart
        .items
        .iter()
        .map(|i| i.label.chars().count())
        .max()
        .unwrap_or(0)
        .min(40);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:label_width$}  {} .. {} ({} days)",
        "",
        window.start,
        window.end,
        window.total_days
    );
    for item in &chart.items {
        let left = ((item.left_percent / 100.0) * width as f64).round() as usize;
        let left = left.min(width - 1);
        let len = ((item.width_percent / 100.0) * width as f64).round().max(1.0) as usize;
        let len = len.min(width - left);
        let mut bar = String::with_capacity(width);
        bar.push_str(&" ".repeat(left));
        bar.extend(std::iter::repeat(item.status.glyph()).take(len));
        bar.push_str(&" ".repeat(width - left - len));
        let label: String = item.label.chars().take(label_width).collect();
        let marker = if item.milestone { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{label:label_width$} {marker}|{bar}| {} -> {}",
            item.start, item.end
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
