//! Pipeline error taxonomy.

use incident_store::StoreError;
use thiserror::Error;

use crate::domain::stage::Stage;
use crate::domain::ticket::TicketError;

/// Errors surfaced by the pipeline engine.
///
/// Primary stage errors always reach the caller of `process_ticket`.
/// Secondary bookkeeping errors (an audit append failing while handling a
/// stage failure) never do; they are logged and swallowed by the recorder's
/// best-effort helpers.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Empty or null submission, rejected before any persistence.
    #[error("empty ticket submission")]
    InvalidInput,

    /// Malformed submission, rejected before any persistence. Carries the
    /// specific violated constraint.
    #[error("invalid ticket data: {0}")]
    InvalidTicket(#[from] TicketError),

    /// A ticket with this id is already in flight or completed; rejected
    /// before stage 1 begins.
    #[error("ticket {0} already exists")]
    DuplicateTicket(String),

    /// A stage collaborator failed. Terminal for the run.
    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    /// A required store write failed. The in-flight stage counts as failed
    /// because its result could not be durably recorded.
    #[error("persistence failed during {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// Stage-scoped error from a collaborator failure.
    pub fn stage(stage: Stage, err: impl std::fmt::Display) -> Self {
        PipelineError::Stage {
            stage,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_names_the_stage() {
        let err = PipelineError::stage(Stage::Classify, "decision source unavailable");
        assert_eq!(
            err.to_string(),
            "classify stage failed: decision source unavailable"
        );
    }

    #[test]
    fn invalid_ticket_carries_constraint() {
        let err = PipelineError::from(TicketError::MissingField("ci_name"));
        assert!(err.to_string().contains("ci_name"));
    }
}
