use crate::error::BitacoraError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// FollowUpRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpRule {
    BeforeStart,
    AfterStart,
    BeforeEnd,
    AfterEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDate {
    Start,
    End,
}

impl FollowUpRule {
    pub fn all() -> &'static [FollowUpRule] {
        &[
            FollowUpRule::BeforeStart,
            FollowUpRule::AfterStart,
            FollowUpRule::BeforeEnd,
            FollowUpRule::AfterEnd,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FollowUpRule::BeforeStart => "before_start",
            FollowUpRule::AfterStart => "after_start",
            FollowUpRule::BeforeEnd => "before_end",
            FollowUpRule::AfterEnd => "after_end",
        }
    }

    /// before-* rules fire once, a number of days ahead of the base date.
    pub fn is_before(self) -> bool {
        matches!(self, FollowUpRule::BeforeStart | FollowUpRule::BeforeEnd)
    }

    pub fn base(self) -> BaseDate {
        match self {
            FollowUpRule::BeforeStart | FollowUpRule::AfterStart => BaseDate::Start,
            FollowUpRule::BeforeEnd | FollowUpRule::AfterEnd => BaseDate::End,
        }
    }
}

impl fmt::Display for FollowUpRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FollowUpRule {
    type Err = BitacoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FollowUpRule::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| BitacoraError::InvalidValue {
                field: "follow-up rule".to_string(),
                reason: format!(
                    "'{s}' is not one of before_start, after_start, before_end, after_end"
                ),
            })
    }
}

// ---------------------------------------------------------------------------
// FollowUpConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<FollowUpRule>,
    /// Lead time for before-* rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Repeat interval for after-* rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Last day a recurring rule may fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

/// How often a follow-up fires once its first date is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    OneShot,
    Until(NaiveDate),
    OpenEnded,
}

impl FollowUpConfig {
    pub fn before(rule: FollowUpRule, days: u32) -> Self {
        Self {
            enabled: true,
            rule: Some(rule),
            days: Some(days),
            ..Self::default()
        }
    }

    pub fn after(rule: FollowUpRule, interval: u32, until: Option<NaiveDate>) -> Self {
        Self {
            enabled: true,
            rule: Some(rule),
            interval: Some(interval),
            until,
            ..Self::default()
        }
    }

    pub fn recurrence(&self) -> Recurrence {
        match self.rule {
            Some(rule) if !rule.is_before() => match self.until {
                Some(until) => Recurrence::Until(until),
                None => Recurrence::OpenEnded,
            },
            _ => Recurrence::OneShot,
        }
    }

    /// Offset in days for the configured rule family. Zero counts as unset.
    fn quantity(&self, rule: FollowUpRule) -> Option<u32> {
        let q = if rule.is_before() { self.days } else { self.interval };
        q.filter(|&n| n > 0)
    }

    pub fn describe(&self) -> String {
        if !self.enabled {
            return "disabled".to_string();
        }
        let Some(rule) = self.rule else {
            return "enabled, no rule".to_string();
        };
        let base = match rule.base() {
            BaseDate::Start => "start",
            BaseDate::End => "end",
        };
        if rule.is_before() {
            match self.days {
                Some(d) => format!("{d} days before {base}"),
                None => format!("before {base}"),
            }
        } else {
            let every = match self.interval {
                Some(i) => format!("every {i} days after {base}"),
                None => format!("after {base}"),
            };
            match self.until {
                Some(until) => format!("{every} until {until}"),
                None => format!("{every}, open-ended"),
            }
        }
    }
}

fn base_date(rule: FollowUpRule, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<NaiveDate> {
    match rule.base() {
        BaseDate::Start => start,
        BaseDate::End => end,
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// First follow-up date for `config`, or `None` when disabled, unruled, or
/// missing the base date or day quantity the rule needs.
pub fn compute_next_follow_up(
    config: &FollowUpConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<NaiveDate> {
    if !config.enabled {
        return None;
    }
    let rule = config.rule?;
    let base = base_date(rule, start, end)?;
    let n = Days::new(u64::from(config.quantity(rule)?));
    if rule.is_before() {
        base.checked_sub_days(n)
    } else {
        base.checked_add_days(n)
    }
}

/// The next follow-up falling on or after `today`.
///
/// Recurring rules step forward from the first date in `interval` increments
/// and stop at the cutoff; one-shot rules yield their single date unless it
/// has already passed.
pub fn next_occurrence_on_or_after(
    config: &FollowUpConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let first = compute_next_follow_up(config, start, end)?;
    let candidate = match config.recurrence() {
        Recurrence::OneShot => return (first >= today).then_some(first),
        _ if first >= today => first,
        _ => {
            let interval = i64::from(config.interval?);
            let behind = (today - first).num_days();
            let steps = (behind + interval - 1) / interval;
            first.checked_add_days(Days::new((steps * interval) as u64))?
        }
    };
    match config.recurrence() {
        Recurrence::Until(until) if candidate > until => None,
        _ => Some(candidate),
    }
}

/// The most recent follow-up falling on or before `day`.
///
/// `None` while the first date is still ahead, and for recurring rules whose
/// cutoff is already behind `day`.
pub fn latest_occurrence_on_or_before(
    config: &FollowUpConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    day: NaiveDate,
) -> Option<NaiveDate> {
    let first = compute_next_follow_up(config, start, end)?;
    if first > day {
        return None;
    }
    match config.recurrence() {
        Recurrence::OneShot => Some(first),
        Recurrence::Until(until) if day > until => None,
        _ => {
            let interval = i64::from(config.quantity(config.rule?)?);
            let steps = (day - first).num_days() / interval;
            first.checked_add_days(Days::new((steps * interval) as u64))
        }
    }
}

/// Human-readable problems with a follow-up configuration against the dates
/// it would be scheduled from. Empty when follow-ups are disabled.
pub fn validate_follow_up(
    config: &FollowUpConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    require_cutoff: bool,
) -> Vec<String> {
    let mut errors = Vec::new();
    if !config.enabled {
        return errors;
    }
    let Some(rule) = config.rule else {
        errors.push("Follow-up rule is required when follow-up is enabled".to_string());
        return errors;
    };

    if config.quantity(rule).is_none() {
        if rule.is_before() {
            errors.push(format!("Days before is required for the {rule} rule"));
        } else {
            errors.push(format!("Interval in days is required for the {rule} rule"));
        }
    }

    if base_date(rule, start, end).is_none() {
        let base = match rule.base() {
            BaseDate::Start => "Start date",
            BaseDate::End => "End date",
        };
        errors.push(format!("{base} is required for the {rule} rule"));
    }

    match config.recurrence() {
        Recurrence::OpenEnded if require_cutoff => {
            errors.push(format!("A cutoff date is required for the recurring {rule} rule"));
        }
        Recurrence::Until(until) => {
            if let Some(first) = compute_next_follow_up(config, start, end) {
                if until < first {
                    errors.push(format!(
                        "Cutoff date {until} is before the first follow-up on {first}"
                    ));
                }
            }
        }
        _ => {}
    }

    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn before_start_subtracts_days() {
        let cfg = FollowUpConfig::before(FollowUpRule::BeforeStart, 3);
        assert_eq!(
            compute_next_follow_up(&cfg, Some(d("2024-06-10")), None),
            Some(d("2024-06-07"))
        );
    }

    #[test]
    fn after_end_adds_interval() {
        let cfg = FollowUpConfig::after(FollowUpRule::AfterEnd, 7, None);
        assert_eq!(
            compute_next_follow_up(&cfg, None, Some(d("2024-06-10"))),
            Some(d("2024-06-17"))
        );
    }

    #[test]
    fn before_end_and_after_start() {
        let before_end = FollowUpConfig::before(FollowUpRule::BeforeEnd, 2);
        assert_eq!(
            compute_next_follow_up(&before_end, Some(d("2024-01-01")), Some(d("2024-03-01"))),
            Some(d("2024-02-28"))
        );
        let after_start = FollowUpConfig::after(FollowUpRule::AfterStart, 30, None);
        assert_eq!(
            compute_next_follow_up(&after_start, Some(d("2024-01-15")), None),
            Some(d("2024-02-14"))
        );
    }

    #[test]
    fn disabled_or_incomplete_yields_none() {
        let mut cfg = FollowUpConfig::before(FollowUpRule::BeforeStart, 3);
        cfg.enabled = false;
        assert_eq!(compute_next_follow_up(&cfg, Some(d("2024-06-10")), None), None);

        let no_rule = FollowUpConfig { enabled: true, days: Some(3), ..Default::default() };
        assert_eq!(compute_next_follow_up(&no_rule, Some(d("2024-06-10")), None), None);

        let no_base = FollowUpConfig::before(FollowUpRule::BeforeEnd, 3);
        assert_eq!(compute_next_follow_up(&no_base, Some(d("2024-06-10")), None), None);

        let wrong_family = FollowUpConfig {
            enabled: true,
            rule: Some(FollowUpRule::AfterStart),
            days: Some(3),
            ..Default::default()
        };
        assert_eq!(compute_next_follow_up(&wrong_family, Some(d("2024-06-10")), None), None);

        let zero = FollowUpConfig::after(FollowUpRule::AfterStart, 0, None);
        assert_eq!(compute_next_follow_up(&zero, Some(d("2024-06-10")), None), None);
    }

    #[test]
    fn recomputing_from_unchanged_config_is_stable() {
        let cfg = FollowUpConfig::after(FollowUpRule::AfterStart, 5, None);
        let start = Some(d("2024-02-26"));
        let first = compute_next_follow_up(&cfg, start, None);
        let again = compute_next_follow_up(&cfg, start, None);
        assert_eq!(first, again);
        assert_eq!(first, Some(d("2024-03-02")));
    }

    #[test]
    fn recurrence_states() {
        assert_eq!(
            FollowUpConfig::before(FollowUpRule::BeforeStart, 1).recurrence(),
            Recurrence::OneShot
        );
        assert_eq!(
            FollowUpConfig::after(FollowUpRule::AfterEnd, 1, None).recurrence(),
            Recurrence::OpenEnded
        );
        assert_eq!(
            FollowUpConfig::after(FollowUpRule::AfterEnd, 1, Some(d("2024-12-31"))).recurrence(),
            Recurrence::Until(d("2024-12-31"))
        );
    }

    #[test]
    fn next_occurrence_steps_forward() {
        let cfg = FollowUpConfig::after(FollowUpRule::AfterStart, 7, None);
        let start = Some(d("2024-06-01"));
        // first = 06-08, then 06-15, 06-22
        assert_eq!(
            next_occurrence_on_or_after(&cfg, start, None, d("2024-06-05")),
            Some(d("2024-06-08"))
        );
        assert_eq!(
            next_occurrence_on_or_after(&cfg, start, None, d("2024-06-15")),
            Some(d("2024-06-15"))
        );
        assert_eq!(
            next_occurrence_on_or_after(&cfg, start, None, d("2024-06-16")),
            Some(d("2024-06-22"))
        );
    }

    #[test]
    fn next_occurrence_respects_cutoff_and_one_shot() {
        let capped = FollowUpConfig::after(FollowUpRule::AfterStart, 7, Some(d("2024-06-20")));
        let start = Some(d("2024-06-01"));
        assert_eq!(
            next_occurrence_on_or_after(&capped, start, None, d("2024-06-16")),
            None
        );
        let once = FollowUpConfig::before(FollowUpRule::BeforeStart, 2);
        assert_eq!(
            next_occurrence_on_or_after(&once, start, None, d("2024-06-01")),
            None
        );
        assert_eq!(
            next_occurrence_on_or_after(&once, start, None, d("2024-05-01")),
            Some(d("2024-05-30"))
        );
    }

    #[test]
    fn latest_occurrence_tracks_recurrence_and_cutoff() {
        let capped = FollowUpConfig::after(FollowUpRule::AfterStart, 7, Some(d("2024-06-20")));
        let start = Some(d("2024-06-01"));
        assert_eq!(latest_occurrence_on_or_before(&capped, start, None, d("2024-06-07")), None);
        assert_eq!(
            latest_occurrence_on_or_before(&capped, start, None, d("2024-06-08")),
            Some(d("2024-06-08"))
        );
        assert_eq!(
            latest_occurrence_on_or_before(&capped, start, None, d("2024-06-16")),
            Some(d("2024-06-15"))
        );
        assert_eq!(latest_occurrence_on_or_before(&capped, start, None, d("2024-12-01")), None);

        let open = FollowUpConfig::after(FollowUpRule::AfterStart, 7, None);
        assert_eq!(
            latest_occurrence_on_or_before(&open, start, None, d("2024-12-01")),
            Some(d("2024-11-30"))
        );

        let once = FollowUpConfig::before(FollowUpRule::BeforeStart, 2);
        assert_eq!(
            latest_occurrence_on_or_before(&once, start, None, d("2024-12-01")),
            Some(d("2024-05-30"))
        );
    }

    #[test]
    fn validation_messages() {
        let start = Some(d("2024-06-10"));
        assert!(validate_follow_up(&FollowUpConfig::default(), None, None, true).is_empty());

        let no_rule = FollowUpConfig { enabled: true, ..Default::default() };
        assert_eq!(validate_follow_up(&no_rule, start, None, false).len(), 1);

        let missing_days = FollowUpConfig {
            enabled: true,
            rule: Some(FollowUpRule::BeforeEnd),
            ..Default::default()
        };
        let errors = validate_follow_up(&missing_days, start, None, false);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Days before"));
        assert!(errors[1].contains("End date"));

        let open = FollowUpConfig::after(FollowUpRule::AfterStart, 7, None);
        assert!(validate_follow_up(&open, start, None, false).is_empty());
        let errors = validate_follow_up(&open, start, None, true);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cutoff"));

        let early_cutoff = FollowUpConfig::after(FollowUpRule::AfterStart, 7, Some(d("2024-06-12")));
        let errors = validate_follow_up(&early_cutoff, start, None, false);
        assert!(errors[0].contains("before the first follow-up"));
    }

    #[test]
    fn describe_reads_naturally() {
        assert_eq!(
            FollowUpConfig::before(FollowUpRule::BeforeStart, 3).describe(),
            "3 days before start"
        );
        assert_eq!(
            FollowUpConfig::after(FollowUpRule::AfterEnd, 7, None).describe(),
            "every 7 days after end, open-ended"
        );
    }

    #[test]
    fn yaml_shape() {
        let cfg = FollowUpConfig::after(FollowUpRule::AfterEnd, 7, None);
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("rule: after_end"));
        assert!(!yaml.contains("days"));
        let parsed: FollowUpConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }
}
