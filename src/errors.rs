//! Typed error taxonomy for the reviewer assignment engine.
//!
//! Domain rejections (`NOT_FOUND`, `PR_EXISTS`, `PR_MERGED`, `NOT_ASSIGNED`,
//! `NO_CANDIDATE`, ...) are expected outcomes the HTTP layer maps to a
//! status code. Store failures wrap into `Database`. `RollbackFailed` is the
//! one condition that needs an operator: an assignment write failed and the
//! compensating request delete failed too, so both causes are reported.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Pull request {id} not found")]
    RequestNotFound { id: String },

    #[error("User {id} not found")]
    UserNotFound { id: String },

    #[error("Author {id} not found")]
    AuthorNotFound { id: String },

    #[error("Team {name} not found")]
    TeamNotFound { name: String },

    #[error("Pull request {id} already exists")]
    RequestExists { id: String },

    #[error("Team {name} already exists")]
    TeamExists { name: String },

    #[error("Cannot reassign reviewers on merged pull request {id}")]
    AlreadyMerged { id: String },

    #[error("Reviewer {reviewer_id} is not assigned to pull request {request_id}")]
    NotAssigned {
        request_id: String,
        reviewer_id: String,
    },

    #[error("No active replacement candidate available")]
    NoCandidate,

    #[error(
        "Reviewer assignment for pull request {request_id} failed ({cause}) and rollback failed too: {rollback}"
    )]
    RollbackFailed {
        request_id: String,
        cause: String,
        rollback: String,
    },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code, used in error responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestNotFound { .. }
            | Self::UserNotFound { .. }
            | Self::AuthorNotFound { .. }
            | Self::TeamNotFound { .. } => "NOT_FOUND",
            Self::RequestExists { .. } => "PR_EXISTS",
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::AlreadyMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::RollbackFailed { .. } | Self::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this is an expected domain rejection rather than a store or
    /// engine failure. Rejections are logged at warn, failures at error.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::RollbackFailed { .. } | Self::Database(_))
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err)
    }
}
