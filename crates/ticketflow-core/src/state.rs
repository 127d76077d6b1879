//! Per-run pipeline state.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    ClassificationResult, ExecutionResult, Stage, Ticket, UpdateResponse, ValidationReport,
};

/// The state threaded through one pipeline run.
///
/// Exclusively owned by its run: stages take it by value and return the
/// successor value, so no stage can observe another's partial writes and no
/// locking is needed inside a run. Each stage writes only the result field it
/// owns plus the shared message trail.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    /// Identifier for this run (not the ticket): one ticket gets exactly one
    /// run, but the ids live in different namespaces.
    pub run_id: Uuid,
    pub ticket: Ticket,
    pub classification: Option<ClassificationResult>,
    pub execution_result: Option<ExecutionResult>,
    pub validation_report: Option<ValidationReport>,
    pub update_response: Option<UpdateResponse>,
    /// Ordered human-readable progress trail; one entry per completed stage.
    pub messages: Vec<String>,
    pub current_stage: Option<Stage>,
    /// Formatted errors accumulated by the central error handler.
    pub errors: Vec<String>,
}

impl PipelineState {
    pub fn new(run_id: Uuid, ticket: Ticket) -> Self {
        Self {
            run_id,
            ticket,
            classification: None,
            execution_result: None,
            validation_report: None,
            update_response: None,
            messages: Vec::new(),
            current_stage: None,
            errors: Vec::new(),
        }
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;

    #[test]
    fn new_state_is_empty() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let state = PipelineState::new(Uuid::new_v4(), ticket);

        assert!(state.classification.is_none());
        assert!(state.execution_result.is_none());
        assert!(state.validation_report.is_none());
        assert!(state.update_response.is_none());
        assert!(state.messages.is_empty());
        assert!(state.errors.is_empty());
        assert!(state.current_stage.is_none());
    }

    #[test]
    fn messages_preserve_order() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let mut state = PipelineState::new(Uuid::new_v4(), ticket);

        state.push_message("first");
        state.push_message("second");
        assert_eq!(state.messages, vec!["first", "second"]);
    }
}
