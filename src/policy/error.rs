use super::ids::{AclId, SourceId};
use thiserror::Error;

/// Outcome of a failed policy operation.
///
/// Everything except [`PolicyError::Storage`] and [`PolicyError::LockPoisoned`]
/// is caused by the caller and is safe to show to an operator.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{0}")]
    Validation(String),

    #[error("{value:?} is not a valid {kind} ID")]
    InvalidId { kind: &'static str, value: String },

    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("acl still has {rules} rules")]
    AclHasRules { acl: AclId, rules: u64 },

    #[error("source still used by {groups} groups")]
    SourceInUse { source_id: SourceId, groups: u64 },

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("policy store lock poisoned")]
    LockPoisoned,
}

impl PolicyError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PolicyError::Storage(_) | PolicyError::LockPoisoned)
    }

    /// Number of references that blocked a delete, if that is what failed.
    pub fn blocking_count(&self) -> Option<u64> {
        match self {
            PolicyError::AclHasRules { rules, .. } => Some(*rules),
            PolicyError::SourceInUse { groups, .. } => Some(*groups),
            _ => None,
        }
    }
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), PolicyError> {
    if value.is_empty() {
        return Err(PolicyError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
