//! Three-step activity form: general data, schedule and follow-up, then the
//! stage-specific payload. Each step validates on its own; moving forward is
//! gated on every step before the destination being valid.

use crate::activity::{Activity, NewActivity};
use crate::error::{BitacoraError, Result};
use crate::fields::{FieldRegistry, FieldSpec};
use crate::followup::{validate_follow_up, FollowUpConfig};
use crate::stage::StageCatalog;
use crate::types::{ActivityStatus, ActivityType, ActorType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// WizardStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    General,
    Schedule,
    Details,
}

impl WizardStep {
    pub fn all() -> &'static [WizardStep] {
        &[WizardStep::General, WizardStep::Schedule, WizardStep::Details]
    }

    /// 1-based position shown in the progress indicator.
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<WizardStep> {
        Self::all().get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<WizardStep> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<WizardStep> {
        Self::from_number(self.number() - 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::General => "General",
            WizardStep::Schedule => "Schedule & follow-up",
            WizardStep::Details => "Stage details",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

// ---------------------------------------------------------------------------
// ActivityDraft
// ---------------------------------------------------------------------------

/// Partially filled activity form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub stage_id: Option<u32>,
    pub stage_name: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub actor_type: Option<ActorType>,
    pub status: Option<ActivityStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
    pub notes: Option<String>,
    #[serde(default)]
    pub payload: BTreeMap<String, String>,
}

impl ActivityDraft {
    /// Seed the form from a stored activity for editing.
    pub fn from_activity(a: &Activity) -> Self {
        Self {
            stage_id: Some(a.stage_id),
            stage_name: Some(a.stage_name.clone()),
            activity_type: Some(a.activity_type),
            actor_type: Some(a.actor_type),
            status: Some(a.status),
            start_date: Some(a.start_date),
            end_date: a.end_date,
            follow_up: a.follow_up.clone().unwrap_or_default(),
            notes: a.notes.clone(),
            payload: a.payload.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Inputs that change what a valid form looks like.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepRules<'a> {
    pub required_fields: &'a [FieldSpec],
    pub require_cutoff: bool,
}

impl<'a> StepRules<'a> {
    pub fn new(required_fields: &'a [FieldSpec]) -> Self {
        Self {
            required_fields,
            require_cutoff: false,
        }
    }
}

pub fn validate_step(step: WizardStep, draft: &ActivityDraft, rules: &StepRules<'_>) -> ValidationResult {
    let mut errors = Vec::new();
    match step {
        WizardStep::General => {
            if draft.stage_id.is_none() {
                errors.push("Stage is required".to_string());
            }
            if draft.activity_type.is_none() {
                errors.push("Activity type is required".to_string());
            }
            if draft.actor_type.is_none() {
                errors.push("Actor type is required".to_string());
            }
            if draft.status.is_none() {
                errors.push("Status is required".to_string());
            }
            if draft.start_date.is_none() {
                errors.push("Start date is required".to_string());
            }
        }
        WizardStep::Schedule => {
            if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
                if start > end {
                    errors.push("End date must be on or after the start date".to_string());
                }
            }
            errors.extend(validate_follow_up(
                &draft.follow_up,
                draft.start_date,
                draft.end_date,
                rules.require_cutoff,
            ));
        }
        WizardStep::Details => {
            for field in rules.required_fields {
                let filled = draft
                    .payload
                    .get(&field.key)
                    .is_some_and(|v| !v.trim().is_empty());
                if !filled {
                    errors.push(format!("{} is required", field.display_name()));
                }
            }
        }
    }
    ValidationResult::from_errors(errors)
}

pub fn validate_all_steps(draft: &ActivityDraft, rules: &StepRules<'_>) -> ValidationResult {
    let errors = WizardStep::all()
        .iter()
        .flat_map(|&step| validate_step(step, draft, rules).errors)
        .collect();
    ValidationResult::from_errors(errors)
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    pub draft: ActivityDraft,
    fields: FieldRegistry,
    require_cutoff: bool,
}

impl Wizard {
    pub fn new(fields: FieldRegistry, require_cutoff: bool) -> Self {
        Self::with_draft(ActivityDraft::default(), fields, require_cutoff)
    }

    pub fn with_draft(draft: ActivityDraft, fields: FieldRegistry, require_cutoff: bool) -> Self {
        Self {
            step: WizardStep::General,
            draft,
            fields,
            require_cutoff,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Payload keys the selected stage demands. Empty until a stage is picked.
    pub fn required_fields(&self) -> &[FieldSpec] {
        match self.draft.stage_id {
            Some(id) => self.fields.required_for(id),
            None => &[],
        }
    }

    pub fn optional_fields(&self) -> &[FieldSpec] {
        self.draft
            .stage_id
            .and_then(|id| self.fields.for_stage(id))
            .map(|s| s.optional.as_slice())
            .unwrap_or(&[])
    }

    fn rules(&self) -> StepRules<'_> {
        StepRules {
            required_fields: self.required_fields(),
            require_cutoff: self.require_cutoff,
        }
    }

    pub fn validate(&self, step: WizardStep) -> ValidationResult {
        validate_step(step, &self.draft, &self.rules())
    }

    /// Advance one step if the current one validates.
    pub fn next(&mut self) -> Result<WizardStep> {
        let result = self.validate(self.step);
        if !result.is_valid {
            return Err(BitacoraError::Validation(result.errors));
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    /// Jump to `target`. Backward moves are free; forward moves require every
    /// step from the current one up to the target to validate.
    pub fn go_to(&mut self, target: WizardStep) -> Result<WizardStep> {
        if target <= self.step {
            self.step = target;
            return Ok(self.step);
        }
        for &step in WizardStep::all()
            .iter()
            .filter(|&&s| s >= self.step && s < target)
        {
            let result = self.validate(step);
            if !result.is_valid {
                return Err(BitacoraError::Validation(result.errors));
            }
        }
        self.step = target;
        Ok(self.step)
    }

    /// Validate the whole form and turn it into an activity ready to store.
    ///
    /// The stage name comes from `catalog`, falling back to the draft's own
    /// name for stages the catalog no longer lists.
    pub fn finish(&self, catalog: &StageCatalog) -> Result<NewActivity> {
        let result = validate_all_steps(&self.draft, &self.rules());
        if !result.is_valid {
            return Err(BitacoraError::Validation(result.errors));
        }
        let d = &self.draft;
        let missing = || BitacoraError::Validation(vec!["form is incomplete".to_string()]);
        let stage_id = d.stage_id.ok_or_else(missing)?;
        let stage_name = catalog
            .get(stage_id)
            .map(|s| s.name.clone())
            .or_else(|| d.stage_name.clone())
            .ok_or_else(|| BitacoraError::StageNotFound(stage_id.to_string()))?;
        Ok(NewActivity {
            stage_id,
            stage_name,
            activity_type: d.activity_type.ok_or_else(missing)?,
            actor_type: d.actor_type.ok_or_else(missing)?,
            status: d.status.ok_or_else(missing)?,
            start_date: d.start_date.ok_or_else(missing)?,
            end_date: d.end_date,
            follow_up: d.follow_up.enabled.then(|| d.follow_up.clone()),
            notes: d.notes.clone().filter(|n| !n.trim().is_empty()),
            payload: d
                .payload
                .iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.trim().to_string()))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::StageFields;
    use crate::followup::FollowUpRule;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn complete_general() -> ActivityDraft {
        ActivityDraft {
            stage_id: Some(4),
            stage_name: Some("Cotización".to_string()),
            activity_type: Some(ActivityType::NewActivity),
            actor_type: Some(ActorType::Provider),
            status: Some(ActivityStatus::Pending),
            start_date: Some(d("2024-06-10")),
            ..Default::default()
        }
    }

    fn registry() -> FieldRegistry {
        let mut reg = FieldRegistry::default();
        reg.set(StageFields {
            stage_id: 4,
            required: vec![FieldSpec::new("quote_amount"), FieldSpec {
                key: "vendor".to_string(),
                label: Some("Vendor".to_string()),
            }],
            optional: vec![FieldSpec::new("currency")],
        });
        reg
    }

    #[test]
    fn step_one_complete_is_valid() {
        let r = validate_step(WizardStep::General, &complete_general(), &StepRules::default());
        assert!(r.is_valid);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn step_one_each_missing_field_yields_one_error() {
        let clear: [(fn(&mut ActivityDraft), &str); 5] = [
            (|d: &mut ActivityDraft| d.stage_id = None, "Stage is required"),
            (|d: &mut ActivityDraft| d.activity_type = None, "Activity type is required"),
            (|d: &mut ActivityDraft| d.actor_type = None, "Actor type is required"),
            (|d: &mut ActivityDraft| d.status = None, "Status is required"),
            (|d: &mut ActivityDraft| d.start_date = None, "Start date is required"),
        ];
        for (remove, message) in clear {
            let mut draft = complete_general();
            remove(&mut draft);
            let r = validate_step(WizardStep::General, &draft, &StepRules::default());
            assert!(!r.is_valid);
            assert_eq!(r.errors, vec![message.to_string()]);
        }
    }

    #[test]
    fn step_two_checks_date_order_and_follow_up() {
        let mut draft = complete_general();
        draft.end_date = Some(d("2024-06-01"));
        let r = validate_step(WizardStep::Schedule, &draft, &StepRules::default());
        assert_eq!(r.errors, vec!["End date must be on or after the start date"]);

        draft.end_date = Some(d("2024-06-10"));
        assert!(validate_step(WizardStep::Schedule, &draft, &StepRules::default()).is_valid);

        draft.end_date = None;
        draft.follow_up = FollowUpConfig::before(FollowUpRule::BeforeEnd, 2);
        let r = validate_step(WizardStep::Schedule, &draft, &StepRules::default());
        assert_eq!(r.errors.len(), 1);
        assert!(r.errors[0].contains("End date is required"));
    }

    #[test]
    fn step_two_cutoff_rule_is_configurable() {
        let mut draft = complete_general();
        draft.follow_up = FollowUpConfig::after(FollowUpRule::AfterStart, 7, None);
        assert!(validate_step(WizardStep::Schedule, &draft, &StepRules::default()).is_valid);
        let strict = StepRules { required_fields: &[], require_cutoff: true };
        assert!(!validate_step(WizardStep::Schedule, &draft, &strict).is_valid);
    }

    #[test]
    fn step_three_requires_trimmed_values() {
        let reg = registry();
        let rules = StepRules::new(reg.required_for(4));
        let mut draft = complete_general();
        draft.payload.insert("quote_amount".to_string(), "   ".to_string());
        let r = validate_step(WizardStep::Details, &draft, &rules);
        assert_eq!(r.errors, vec!["quote_amount is required", "Vendor is required"]);

        draft.payload.insert("quote_amount".to_string(), "1500".to_string());
        draft.payload.insert("vendor".to_string(), "Acme".to_string());
        assert!(validate_step(WizardStep::Details, &draft, &rules).is_valid);
    }

    #[test]
    fn all_steps_concatenate_in_order() {
        let reg = registry();
        let rules = StepRules::new(reg.required_for(4));
        let mut draft = complete_general();
        draft.status = None;
        draft.end_date = Some(d("2024-01-01"));
        let r = validate_all_steps(&draft, &rules);
        assert!(!r.is_valid);
        assert_eq!(r.errors.len(), 4);
        assert_eq!(r.errors[0], "Status is required");
        assert!(r.errors[1].starts_with("End date must be"));
        assert_eq!(r.errors[3], "Vendor is required");
    }

    #[test]
    fn next_is_gated_and_back_is_free() {
        let mut wizard = Wizard::new(registry(), false);
        assert!(matches!(wizard.next(), Err(BitacoraError::Validation(e)) if e.len() == 5));
        assert_eq!(wizard.step(), WizardStep::General);

        wizard.draft = complete_general();
        assert_eq!(wizard.next().unwrap(), WizardStep::Schedule);
        assert_eq!(wizard.next().unwrap(), WizardStep::Details);
        assert_eq!(wizard.required_fields().len(), 2);
        assert_eq!(wizard.optional_fields().len(), 1);
        assert!(wizard.next().is_err());

        assert_eq!(wizard.back(), WizardStep::Schedule);
        assert_eq!(wizard.back(), WizardStep::General);
        assert_eq!(wizard.back(), WizardStep::General);
    }

    #[test]
    fn go_to_validates_skipped_steps() {
        let mut wizard = Wizard::new(registry(), false);
        wizard.draft = complete_general();
        wizard.draft.end_date = Some(d("2024-01-01"));
        assert!(wizard.go_to(WizardStep::Details).is_err());
        assert_eq!(wizard.step(), WizardStep::General);

        wizard.draft.end_date = None;
        assert_eq!(wizard.go_to(WizardStep::Details).unwrap(), WizardStep::Details);
        assert_eq!(wizard.go_to(WizardStep::General).unwrap(), WizardStep::General);
    }

    #[test]
    fn finish_builds_activity() {
        let mut wizard = Wizard::new(registry(), false);
        wizard.draft = complete_general();
        assert!(wizard.finish(&StageCatalog::default()).is_err());

        wizard.draft.payload.insert("quote_amount".to_string(), " 1500 ".to_string());
        wizard.draft.payload.insert("vendor".to_string(), "Acme".to_string());
        wizard.draft.payload.insert("currency".to_string(), "".to_string());
        wizard.draft.follow_up = FollowUpConfig::before(FollowUpRule::BeforeStart, 3);
        let new = wizard.finish(&StageCatalog::default()).unwrap();
        assert_eq!(new.stage_id, 4);
        assert_eq!(new.payload.len(), 2);
        assert_eq!(new.payload["quote_amount"], "1500");
        assert!(new.follow_up.is_some());
    }

    #[test]
    fn disabled_follow_up_is_dropped() {
        let mut wizard = Wizard::new(FieldRegistry::default(), false);
        wizard.draft = complete_general();
        wizard.draft.follow_up.days = Some(3);
        assert!(wizard
            .finish(&StageCatalog::default())
            .unwrap()
            .follow_up
            .is_none());
    }

    #[test]
    fn finish_names_the_stage_from_the_catalog() {
        let catalog = StageCatalog::default();
        let mut wizard = Wizard::new(FieldRegistry::default(), false);
        wizard.draft = complete_general();
        wizard.draft.stage_id = Some(3);
        wizard.draft.stage_name = None;
        let new = wizard.finish(&catalog).unwrap();
        assert_eq!(new.stage_name, catalog.get(3).unwrap().name);

        wizard.draft.stage_id = Some(40);
        assert!(matches!(
            wizard.finish(&catalog),
            Err(BitacoraError::StageNotFound(_))
        ));
        wizard.draft.stage_name = Some("Legado".to_string());
        assert_eq!(wizard.finish(&catalog).unwrap().stage_name, "Legado");
    }

    #[test]
    fn step_numbers() {
        assert_eq!(WizardStep::from_number(1), Some(WizardStep::General));
        assert_eq!(WizardStep::from_number(0), None);
        assert_eq!(WizardStep::from_number(4), None);
        assert_eq!(WizardStep::Details.next(), None);
        assert_eq!(WizardStep::General.prev(), None);
        assert_eq!(WizardStep::Schedule.to_string(), "2. Schedule & follow-up");
    }
}
