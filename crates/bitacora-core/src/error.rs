use thiserror::Error;

#[derive(Debug, Error)]
pub enum BitacoraError {
    #[error("not initialized: run 'bitacora init'")]
    NotInitialized,

    #[error("development not found: {0}")]
    DevelopmentNotFound(String),

    #[error("development already exists: {0}")]
    DevelopmentExists(String),

    #[error("invalid id '{0}': must be alphanumeric with hyphens or underscores")]
    InvalidId(String),

    #[error("activity {id} not found in development '{development}'")]
    ActivityNotFound { development: String, id: u64 },

    #[error("stage not found: {0}")]
    StageNotFound(String),

    #[error(transparent)]
    StageParse(#[from] StageParseError),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("room already exists: {0}")]
    RoomExists(String),

    #[error("reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("reservation conflicts with '{title}' in room '{room}' ({start} - {end})")]
    ReservationConflict {
        room: String,
        title: String,
        start: String,
        end: String,
    },

    #[error("cannot read import file: {0}")]
    ImportUnreadable(String),

    #[error("cannot parse spreadsheet: {0}")]
    ImportUnparseable(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A stage reference whose textual form has no leading stage number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read a stage number from '{input}'")]
pub struct StageParseError {
    pub input: String,
}

pub type Result<T> = std::result::Result<T, BitacoraError>;
