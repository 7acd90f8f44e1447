//! Caller-facing error kinds.
//!
//! Every use-case error converts into a [`ToolError`]; the kind is decided by the
//! error's variant, never by its message.

use serde::Serialize;

use questkeep_domain::value_objects::DiceParseError;
use questkeep_domain::DomainError;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::character::CharacterError;
use crate::use_cases::dice::DiceError;
use crate::use_cases::encounter::EncounterError;
use crate::use_cases::history::HistoryError;
use crate::use_cases::item::ItemError;
use crate::use_cases::party::PartyError;
use crate::use_cases::query::QueryError;
use crate::use_cases::quest::QuestError;
use crate::use_cases::time::TimeError;
use crate::use_cases::validation::ValidationError;
use crate::use_cases::world::WorldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    BoundaryViolation,
    Conflict,
    State,
    /// Storage failures; never caused by caller input
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Permission => "permission",
            ErrorKind::BoundaryViolation => "boundary_violation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::State => "state",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }
}

impl From<DomainError> for ToolError {
    fn from(err: DomainError) -> Self {
        let kind = match &err {
            DomainError::Validation(_) | DomainError::InvalidId(_) | DomainError::Parse(_) => {
                ErrorKind::Validation
            }
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Constraint(_) => ErrorKind::Conflict,
            DomainError::BoundaryViolation(_) => ErrorKind::BoundaryViolation,
            DomainError::InvalidStateTransition(_) => ErrorKind::State,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<RepoError> for ToolError {
    fn from(err: RepoError) -> Self {
        let kind = match &err {
            RepoError::NotFound { .. } | RepoError::KindMismatch { .. } => ErrorKind::NotFound,
            RepoError::Database { .. } | RepoError::Serialization(_) => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ValidationError> for ToolError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<DiceParseError> for ToolError {
    fn from(err: DiceParseError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Internal, format!("Failed to encode result: {}", err))
    }
}

/// Use-case errors that only wrap validation, domain and repository errors.
macro_rules! tool_error_from {
    ($($error:ident),+ $(,)?) => {
        $(
            impl From<$error> for ToolError {
                fn from(err: $error) -> Self {
                    match err {
                        $error::Validation(e) => e.into(),
                        $error::Domain(e) => e.into(),
                        $error::Repo(e) => e.into(),
                    }
                }
            }
        )+
    };
}

tool_error_from!(ItemError, PartyError, QuestError, EncounterError, QueryError);

impl From<CharacterError> for ToolError {
    fn from(err: CharacterError) -> Self {
        match err {
            CharacterError::Validation(e) => e.into(),
            CharacterError::Domain(e) => e.into(),
            CharacterError::Repo(e) => e.into(),
            other @ (CharacterError::SpawnCount { .. } | CharacterError::UnnamedAbility) => {
                Self::validation(other.to_string())
            }
        }
    }
}

impl From<WorldError> for ToolError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::Validation(e) => e.into(),
            WorldError::Domain(e) => e.into(),
            WorldError::Repo(e) => e.into(),
            other @ WorldError::NameRequired(_) => Self::validation(other.to_string()),
        }
    }
}

impl From<HistoryError> for ToolError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Validation(e) => e.into(),
            HistoryError::Domain(e) => e.into(),
            HistoryError::Repo(e) => e.into(),
            other @ HistoryError::TitleRequired => Self::validation(other.to_string()),
        }
    }
}

impl From<TimeError> for ToolError {
    fn from(err: TimeError) -> Self {
        match err {
            TimeError::Domain(e) => e.into(),
            TimeError::Repo(e) => e.into(),
        }
    }
}

impl From<DiceError> for ToolError {
    fn from(err: DiceError) -> Self {
        match err {
            DiceError::Validation(e) => e.into(),
            DiceError::Parse(e) => e.into(),
        }
    }
}
