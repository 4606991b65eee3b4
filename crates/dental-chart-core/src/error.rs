//! Domain errors for chart operations.

use thiserror::Error;

use crate::db::DbError;
use crate::models::{InvalidStatusTransition, InvalidSurface};

/// Error class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Persistence,
    Authorization,
}

/// Chart engine errors.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Tooth not found: {0}")]
    ToothNotFound(String),

    #[error("Condition not found: {0}")]
    ConditionNotFound(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("{kind} catalog entry not found: {id}")]
    CatalogEntryNotFound { kind: &'static str, id: i64 },

    #[error("Invalid surface: {0}")]
    InvalidSurface(#[from] InvalidSurface),

    #[error("Invalid status transition: {0}")]
    InvalidStatusTransition(#[from] InvalidStatusTransition),

    #[error("Invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Tooth {tooth} is {implied}, not {supplied}")]
    DentitionMismatch {
        tooth: String,
        supplied: &'static str,
        implied: &'static str,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),
}

pub type ChartResult<T> = Result<T, ChartError>;

impl ChartError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ChartError::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::InvalidSurface(_)
            | ChartError::InvalidStatusTransition(_)
            | ChartError::InvalidField { .. } => ErrorKind::Validation,
            ChartError::PatientNotFound(_)
            | ChartError::ToothNotFound(_)
            | ChartError::ConditionNotFound(_)
            | ChartError::ProcedureNotFound(_)
            | ChartError::CatalogEntryNotFound { .. } => ErrorKind::NotFound,
            ChartError::DentitionMismatch { .. } => ErrorKind::Conflict,
            ChartError::Unauthorized(_) => ErrorKind::Authorization,
            ChartError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Offending input field for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ChartError::InvalidSurface(_) => Some("surface"),
            ChartError::InvalidStatusTransition(_) => Some("status"),
            ChartError::InvalidField { field, .. } => Some(*field),
            ChartError::DentitionMismatch { .. } => Some("dentition_type"),
            _ => None,
        }
    }

    /// Only persistence failures merit a retry of the atomic write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChartError::Persistence(_))
    }
}

impl From<rusqlite::Error> for ChartError {
    fn from(e: rusqlite::Error) -> Self {
        ChartError::Persistence(DbError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ChartError::ConditionNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            ChartError::DentitionMismatch {
                tooth: "A".into(),
                supplied: "permanent",
                implied: "primary",
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ChartError::invalid("date_performed", "bad").kind(), ErrorKind::Validation);
        assert_eq!(
            ChartError::Persistence(DbError::NotFound("x".into())).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_field_detail() {
        let err = ChartError::from(InvalidSurface("empty".into()));
        assert_eq!(err.field(), Some("surface"));
        assert_eq!(ChartError::invalid("price", "negative").field(), Some("price"));
        assert_eq!(ChartError::Unauthorized("u".into()).field(), None);
    }
}
