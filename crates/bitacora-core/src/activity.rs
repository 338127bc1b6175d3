use crate::development::Development;
use crate::error::{BitacoraError, Result};
use crate::followup::{compute_next_follow_up, latest_occurrence_on_or_before, FollowUpConfig};
use crate::paths;
use crate::types::{ActivityStatus, ActivityType, ActorType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub development_id: String,
    pub stage_id: u32,
    pub stage_name: String,
    pub activity_type: ActivityType,
    pub actor_type: ActorType,
    pub status: ActivityStatus,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating or replacing an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub stage_id: u32,
    pub stage_name: String,
    pub activity_type: ActivityType,
    pub actor_type: ActorType,
    pub status: ActivityStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub follow_up: Option<FollowUpConfig>,
    pub notes: Option<String>,
    pub payload: BTreeMap<String, String>,
}

/// An open activity whose follow-up has come around.
#[derive(Debug, Clone, Serialize)]
pub struct DueFollowUp {
    pub due_on: NaiveDate,
    pub activity: Activity,
}

impl Activity {
    fn from_new(id: u64, development_id: &str, new: NewActivity) -> Self {
        let now = Utc::now();
        let mut activity = Self {
            id,
            development_id: development_id.to_string(),
            stage_id: new.stage_id,
            stage_name: new.stage_name,
            activity_type: new.activity_type,
            actor_type: new.actor_type,
            status: new.status,
            start_date: new.start_date,
            end_date: new.end_date,
            next_follow_up_at: None,
            follow_up: new.follow_up,
            notes: new.notes,
            payload: new.payload,
            created_at: now,
            updated_at: now,
        };
        activity.refresh_follow_up();
        activity
    }

    /// Recompute `next_follow_up_at` from the stored configuration and dates.
    pub fn refresh_follow_up(&mut self) {
        self.next_follow_up_at = self
            .follow_up
            .as_ref()
            .and_then(|cfg| compute_next_follow_up(cfg, Some(self.start_date), self.end_date));
    }
}

// ---------------------------------------------------------------------------
// ActivityLog
// ---------------------------------------------------------------------------

/// Every activity logged against one development.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    pub development_id: String,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl ActivityLog {
    pub fn new(development_id: impl Into<String>) -> Self {
        Self {
            development_id: development_id.into(),
            next_id: 1,
            activities: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, development_id: &str) -> Result<Self> {
        paths::validate_id(development_id)?;
        if !Development::exists(root, development_id) {
            return Err(BitacoraError::DevelopmentNotFound(development_id.to_string()));
        }
        let path = paths::activities_path(root, development_id);
        if !path.exists() {
            return Ok(Self::new(development_id));
        }
        let data = std::fs::read_to_string(&path)?;
        let mut log: ActivityLog = serde_yaml::from_str(&data)?;
        // Older files may lack the counter.
        let max_id = log.activities.iter().map(|a| a.id).max().unwrap_or(0);
        log.next_id = log.next_id.max(max_id + 1);
        Ok(log)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        paths::validate_id(&self.development_id)?;
        crate::io::write_yaml(&paths::activities_path(root, &self.development_id), self)
    }

    // ---------------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------------

    pub fn add(&mut self, new: NewActivity) -> &Activity {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let activity = Activity::from_new(id, &self.development_id, new);
        info!(
            development = %self.development_id,
            id,
            stage = activity.stage_id,
            "activity logged"
        );
        self.activities.push(activity);
        &self.activities[self.activities.len() - 1]
    }

    /// Replace the editable fields of an activity, keeping its id and
    /// creation time.
    pub fn update(&mut self, id: u64, new: NewActivity) -> Result<&Activity> {
        let development_id = self.development_id.clone();
        let activity = self.find_mut(id)?;
        let created_at = activity.created_at;
        *activity = Activity::from_new(id, &development_id, new);
        activity.created_at = created_at;
        info!(development = %development_id, id, "activity updated");
        Ok(activity)
    }

    pub fn set_status(&mut self, id: u64, status: ActivityStatus) -> Result<&Activity> {
        let activity = self.find_mut(id)?;
        activity.status = status;
        activity.updated_at = Utc::now();
        Ok(activity)
    }

    pub fn remove(&mut self, id: u64) -> Result<Activity> {
        let pos = self
            .activities
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| self.not_found(id))?;
        info!(development = %self.development_id, id, "activity deleted");
        Ok(self.activities.remove(pos))
    }

    pub fn get(&self, id: u64) -> Result<&Activity> {
        self.activities
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| self.not_found(id))
    }

    pub fn for_stage(&self, stage_id: u32) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(move |a| a.stage_id == stage_id)
    }

    /// Open activities with a follow-up on or before `day`, each paired with
    /// its latest occurrence, earliest first.
    pub fn due_follow_ups(&self, day: NaiveDate) -> Vec<DueFollowUp> {
        let mut due: Vec<DueFollowUp> = self
            .activities
            .iter()
            .filter(|a| matches!(a.status, ActivityStatus::Pending | ActivityStatus::InProgress))
            .filter_map(|a| {
                let due_on = match &a.follow_up {
                    Some(cfg) => latest_occurrence_on_or_before(cfg, Some(a.start_date), a.end_date, day),
                    None => a.next_follow_up_at.filter(|&d| d <= day),
                }?;
                Some(DueFollowUp {
                    due_on,
                    activity: a.clone(),
                })
            })
            .collect();
        due.sort_by_key(|d| (d.due_on, d.activity.id));
        due
    }

    fn find_mut(&mut self, id: u64) -> Result<&mut Activity> {
        let development = self.development_id.clone();
        self.activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(BitacoraError::ActivityNotFound { development, id })
    }

    fn not_found(&self, id: u64) -> BitacoraError {
        BitacoraError::ActivityNotFound {
            development: self.development_id.clone(),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::followup::FollowUpRule;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_activity(stage_id: u32, start: &str) -> NewActivity {
        NewActivity {
            stage_id,
            stage_name: format!("Stage {stage_id}"),
            activity_type: ActivityType::NewActivity,
            actor_type: ActorType::InternalTeam,
            status: ActivityStatus::Pending,
            start_date: d(start),
            end_date: None,
            follow_up: None,
            notes: None,
            payload: BTreeMap::new(),
        }
    }

    #[test]
    fn ids_are_sequential() {
        let mut log = ActivityLog::new("DEV-1");
        assert_eq!(log.add(new_activity(1, "2024-01-01")).id, 1);
        assert_eq!(log.add(new_activity(2, "2024-01-02")).id, 2);
        log.remove(2).unwrap();
        assert_eq!(log.add(new_activity(2, "2024-01-03")).id, 3);
    }

    #[test]
    fn add_computes_follow_up() {
        let mut log = ActivityLog::new("DEV-1");
        let mut new = new_activity(3, "2024-06-10");
        new.follow_up = Some(FollowUpConfig::before(FollowUpRule::BeforeStart, 3));
        let a = log.add(new);
        assert_eq!(a.next_follow_up_at, Some(d("2024-06-07")));
    }

    #[test]
    fn update_recomputes_and_keeps_identity() {
        let mut log = ActivityLog::new("DEV-1");
        let created = log.add(new_activity(3, "2024-06-10")).created_at;
        let mut edit = new_activity(3, "2024-06-10");
        edit.end_date = Some(d("2024-06-20"));
        edit.follow_up = Some(FollowUpConfig::after(FollowUpRule::AfterEnd, 7, None));
        edit.status = ActivityStatus::Completed;
        let a = log.update(1, edit).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(a.created_at, created);
        assert_eq!(a.next_follow_up_at, Some(d("2024-06-27")));
    }

    #[test]
    fn refreshing_follow_up_is_idempotent() {
        let mut log = ActivityLog::new("DEV-1");
        let mut new = new_activity(3, "2024-06-10");
        new.follow_up = Some(FollowUpConfig::after(FollowUpRule::AfterStart, 14, None));
        log.add(new);
        let mut a = log.get(1).unwrap().clone();
        let first = a.next_follow_up_at;
        a.refresh_follow_up();
        a.refresh_follow_up();
        assert_eq!(a.next_follow_up_at, first);
    }

    #[test]
    fn missing_ids_are_errors() {
        let mut log = ActivityLog::new("DEV-1");
        assert!(matches!(
            log.remove(9),
            Err(BitacoraError::ActivityNotFound { id: 9, .. })
        ));
        assert!(log.update(9, new_activity(1, "2024-01-01")).is_err());
        assert!(log.set_status(9, ActivityStatus::Completed).is_err());
    }

    #[test]
    fn due_follow_ups_skip_closed_activities() {
        let mut log = ActivityLog::new("DEV-1");
        for (start, status) in [
            ("2024-06-10", ActivityStatus::Pending),
            ("2024-06-05", ActivityStatus::Completed),
            ("2024-06-20", ActivityStatus::InProgress),
        ] {
            let mut new = new_activity(2, start);
            new.status = status;
            new.follow_up = Some(FollowUpConfig::before(FollowUpRule::BeforeStart, 1));
            log.add(new);
        }
        let due = log.due_follow_ups(d("2024-06-15"));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].activity.id, 1);
        assert_eq!(due[0].due_on, d("2024-06-09"));
    }

    #[test]
    fn due_follow_ups_advance_and_stop_at_cutoff() {
        let mut log = ActivityLog::new("DEV-1");
        let mut new = new_activity(2, "2024-06-01");
        new.status = ActivityStatus::InProgress;
        new.follow_up = Some(FollowUpConfig::after(
            FollowUpRule::AfterStart,
            7,
            Some(d("2024-06-20")),
        ));
        log.add(new);
        assert_eq!(log.activities[0].next_follow_up_at, Some(d("2024-06-08")));

        let due = log.due_follow_ups(d("2024-06-16"));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].due_on, d("2024-06-15"));

        assert!(log.due_follow_ups(d("2024-12-01")).is_empty());
    }

    #[test]
    fn load_requires_development_and_persists() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ActivityLog::load(dir.path(), "DEV-1"),
            Err(BitacoraError::DevelopmentNotFound(_))
        ));
        assert!(matches!(
            ActivityLog::load(dir.path(), "../DEV-1"),
            Err(BitacoraError::InvalidId(_))
        ));

        Development::create(dir.path(), Development::new("DEV-1", "A")).unwrap();
        let mut log = ActivityLog::load(dir.path(), "DEV-1").unwrap();
        let mut new = new_activity(4, "2024-03-01");
        new.payload.insert("quote".to_string(), "1200".to_string());
        log.add(new);
        log.save(dir.path()).unwrap();

        let loaded = ActivityLog::load(dir.path(), "DEV-1").unwrap();
        assert_eq!(loaded.activities.len(), 1);
        assert_eq!(loaded.next_id, 2);
        assert_eq!(loaded.for_stage(4).count(), 1);
        assert_eq!(loaded.get(1).unwrap().payload["quote"], "1200");
    }
}
