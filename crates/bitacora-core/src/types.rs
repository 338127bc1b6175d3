use crate::error::BitacoraError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn invalid(field: &str, value: &str, expected: &[&str]) -> BitacoraError {
    BitacoraError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{value}' is not one of {}", expected.join(", ")),
    }
}

/// Text equality ignoring surrounding whitespace and case, accented letters
/// included (`"APROBACIÓN"` equals `"aprobación"`).
pub fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// ActivityStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "en_curso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl ActivityStatus {
    pub fn all() -> &'static [ActivityStatus] {
        &[
            ActivityStatus::Pending,
            ActivityStatus::InProgress,
            ActivityStatus::Completed,
            ActivityStatus::Cancelled,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pendiente",
            ActivityStatus::InProgress => "en_curso",
            ActivityStatus::Completed => "completada",
            ActivityStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = BitacoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityStatus::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ActivityStatus::all().iter().map(|s| s.as_str()).collect();
                invalid("status", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// ActivityType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "nueva_actividad")]
    NewActivity,
    #[serde(rename = "seguimiento")]
    FollowUp,
    #[serde(rename = "cierre_etapa")]
    StageClosure,
    #[serde(rename = "cancelacion")]
    Cancellation,
}

impl ActivityType {
    pub fn all() -> &'static [ActivityType] {
        &[
            ActivityType::NewActivity,
            ActivityType::FollowUp,
            ActivityType::StageClosure,
            ActivityType::Cancellation,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::NewActivity => "nueva_actividad",
            ActivityType::FollowUp => "seguimiento",
            ActivityType::StageClosure => "cierre_etapa",
            ActivityType::Cancellation => "cancelacion",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = BitacoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ActivityType::all().iter().map(|t| t.as_str()).collect();
                invalid("activity type", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// ActorType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorType {
    #[serde(rename = "equipo_interno")]
    InternalTeam,
    #[serde(rename = "proveedor")]
    Provider,
    #[serde(rename = "usuario")]
    User,
    #[serde(rename = "gerencia")]
    Management,
}

impl ActorType {
    pub fn all() -> &'static [ActorType] {
        &[
            ActorType::InternalTeam,
            ActorType::Provider,
            ActorType::User,
            ActorType::Management,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActorType::InternalTeam => "equipo_interno",
            ActorType::Provider => "proveedor",
            ActorType::User => "usuario",
            ActorType::Management => "gerencia",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorType {
    type Err = BitacoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActorType::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ActorType::all().iter().map(|a| a.as_str()).collect();
                invalid("actor type", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn same_text_folds_accented_letters() {
        assert!(same_text("APROBACIÓN", "Aprobación"));
        assert!(same_text(" Cancelado ", "CANCELADO"));
        assert!(!same_text("Aprobacion", "Aprobación"));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(ActivityStatus::from_str("en_curso").unwrap(), ActivityStatus::InProgress);
        assert_eq!(ActivityStatus::Completed.to_string(), "completada");
        let json = serde_json::to_string(&ActivityStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelada\"");
    }

    #[test]
    fn unknown_status_lists_choices() {
        let err = ActivityStatus::from_str("done").unwrap_err().to_string();
        assert!(err.contains("pendiente"));
        assert!(err.contains("'done'"));
    }

    #[test]
    fn actor_and_activity_types_parse() {
        assert_eq!(ActorType::from_str("proveedor").unwrap(), ActorType::Provider);
        assert_eq!(
            ActivityType::from_str("cierre_etapa").unwrap(),
            ActivityType::StageClosure
        );
        assert!(ActorType::from_str("robot").is_err());
    }
}
