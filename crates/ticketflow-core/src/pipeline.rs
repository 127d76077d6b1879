//! Pipeline engine: sequences the stages, persists every transition and owns
//! the centralized error-handling path.

use std::sync::Arc;

use incident_store::{AuditEntry, IncidentPatch, IncidentStatus, IncidentStore, NewIncident};
use serde_json::json;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::classifier::{Classifier, RuleClassifier};
use crate::domain::{PipelineError, Stage, Ticket, TicketDigest, ValidationStatus};
use crate::executor::{Executor, PlaybookExecutor};
use crate::obs;
use crate::receiver::TicketReceiver;
use crate::recording::AuditRecorder;
use crate::state::PipelineState;
use crate::updater::{ServiceDeskUpdater, Updater};
use crate::validator::{ChecklistValidator, Validator};

/// A stage failure together with the state accumulated before it.
///
/// The state travels with the error so the central handler can record the
/// partial message trail; only the error itself reaches the caller.
struct StageFailure {
    state: PipelineState,
    error: PipelineError,
}

/// Executes the full pipeline for one ticket at a time.
///
/// Construction wires in the default collaborators; each seam can be swapped
/// with the `with_*` builders (tests inject failing collaborators this way).
pub struct TicketPipeline {
    store: Arc<dyn IncidentStore>,
    recorder: AuditRecorder,
    receiver: TicketReceiver,
    classifier: Arc<dyn Classifier>,
    executor: Arc<dyn Executor>,
    validator: Arc<dyn Validator>,
    updater: Arc<dyn Updater>,
}

impl TicketPipeline {
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self {
            recorder: AuditRecorder::new(store.clone()),
            store,
            receiver: TicketReceiver::new(),
            classifier: Arc::new(RuleClassifier::new()),
            executor: Arc::new(PlaybookExecutor::new()),
            validator: Arc::new(ChecklistValidator::new()),
            updater: Arc::new(ServiceDeskUpdater::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_updater(mut self, updater: Arc<dyn Updater>) -> Self {
        self.updater = updater;
        self
    }

    /// Process one raw ticket through the full pipeline.
    ///
    /// Each ticket gets exactly one attempt; there are no retries and no
    /// stage skipping. Primary failures always surface to the caller, with
    /// the incident left in status `failed` (best-effort) and the partial
    /// message trail preserved.
    pub async fn process_ticket(
        &self,
        raw: serde_json::Value,
    ) -> Result<PipelineState, PipelineError> {
        if raw.is_null() || raw.as_object().is_some_and(|o| o.is_empty()) {
            return Err(PipelineError::InvalidInput);
        }

        let ticket = self.receiver.receive(&raw)?;
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string(), ticket.ticket_id.as_str());
        self.run(run_id, ticket).instrument(span).await
    }

    /// The span-scoped body of one pipeline run.
    async fn run(&self, run_id: Uuid, ticket: Ticket) -> Result<PipelineState, PipelineError> {
        obs::emit_run_started(
            ticket.ticket_id.as_str(),
            ticket.priority.as_str(),
            &ticket.environment,
        );

        // Duplicate precondition before any stage work begins. The store's
        // unique index remains the authoritative guard under races.
        let existing = self
            .store
            .get_incident(&ticket.ticket_id)
            .await
            .map_err(|source| PipelineError::Persistence {
                operation: "get_incident",
                source,
            })?;
        if existing.is_some() {
            return Err(PipelineError::DuplicateTicket(ticket.ticket_id.to_string()));
        }

        let mut state = PipelineState::new(run_id, ticket);
        state.current_stage = Some(Stage::Receive);

        // Ingestion: no incident row exists yet, so creation failures
        // (duplicate race, store outage) reject the run outright.
        self.recorder
            .create_incident(NewIncident {
                ticket_id: state.ticket.ticket_id.clone(),
                priority: state.ticket.priority,
                environment: state.ticket.environment.clone(),
            })
            .await?;
        state.push_message("Ticket received and validated");

        let digest = TicketDigest::of(&state.ticket);
        let receive_entry = AuditEntry::new(
            state.ticket.ticket_id.clone(),
            Stage::Receive.audit_action(),
            Stage::Receive.agent(),
            json!({
                "digest": digest.as_str(),
                "priority": state.ticket.priority.as_str(),
                "environment": state.ticket.environment,
                "requested_by": state.ticket.requested_by,
            }),
        );
        if let Err(error) = self.recorder.append_audit(receive_entry).await {
            // The incident row exists, so this failure is handled like any
            // stage failure: recorded best-effort, then re-raised.
            self.handle_stage_failure(&mut state, Stage::Receive, &error)
                .await;
            obs::emit_run_finished(state.ticket.ticket_id.as_str(), "failed", 0);
            return Err(error);
        }

        let mut stages_completed = 0usize;
        for stage in Stage::PIPELINE {
            state.current_stage = Some(stage);
            obs::emit_stage_started(state.ticket.ticket_id.as_str(), stage.name());

            state = match self.run_stage(stage, state).await {
                Ok(next) => {
                    obs::emit_stage_completed(next.ticket.ticket_id.as_str(), stage.name());
                    stages_completed += 1;
                    next
                }
                Err(StageFailure { mut state, error }) => {
                    self.handle_stage_failure(&mut state, stage, &error).await;
                    obs::emit_run_finished(state.ticket.ticket_id.as_str(), "failed", stages_completed);
                    return Err(error);
                }
            };
        }

        let final_status = match &state.validation_report {
            Some(report) => report.overall_status.to_string(),
            None => "unknown".to_string(),
        };
        info!(
            ticket_id = %state.ticket.ticket_id,
            status = %final_status,
            messages = state.messages.len(),
            "ticket processed"
        );
        obs::emit_run_finished(state.ticket.ticket_id.as_str(), &final_status, stages_completed);
        Ok(state)
    }

    /// Run one stage against owned state.
    ///
    /// On failure the state is handed back alongside the error so the caller
    /// can record the partial trail.
    async fn run_stage(
        &self,
        stage: Stage,
        mut state: PipelineState,
    ) -> Result<PipelineState, StageFailure> {
        let outcome = match stage {
            Stage::Classify => self.classify_stage(&mut state).await,
            Stage::Execute => self.execute_stage(&mut state).await,
            Stage::Validate => self.validate_stage(&mut state).await,
            Stage::Update => self.update_stage(&mut state).await,
            // Ingestion runs before the stage loop and never dispatches here.
            Stage::Receive => Ok(()),
        };
        match outcome {
            Ok(()) => Ok(state),
            Err(error) => Err(StageFailure { state, error }),
        }
    }

    async fn classify_stage(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let classification = self
            .classifier
            .classify(&state.ticket)
            .await
            .map_err(|e| PipelineError::stage(Stage::Classify, e))?;
        let value = serde_json::to_value(&classification)
            .map_err(|e| PipelineError::stage(Stage::Classify, e))?;

        state.push_message(format!(
            "Ticket classified: {} {}",
            classification.middleware_type, classification.action
        ));
        self.recorder
            .update_incident(
                &state.ticket.ticket_id,
                IncidentPatch::classified(value.clone()),
            )
            .await?;
        self.recorder
            .append_audit(AuditEntry::new(
                state.ticket.ticket_id.clone(),
                Stage::Classify.audit_action(),
                Stage::Classify.agent(),
                value,
            ))
            .await?;

        state.classification = Some(classification);
        Ok(())
    }

    async fn execute_stage(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let Some(classification) = state.classification.as_ref() else {
            return Err(PipelineError::stage(
                Stage::Execute,
                "classification missing from pipeline state",
            ));
        };
        let execution = self
            .executor
            .execute(&state.ticket, classification)
            .await
            .map_err(|e| PipelineError::stage(Stage::Execute, e))?;
        let value = serde_json::to_value(&execution)
            .map_err(|e| PipelineError::stage(Stage::Execute, e))?;

        state.push_message(format!("Playbook executed: {}", execution.status));
        self.recorder
            .update_incident(&state.ticket.ticket_id, IncidentPatch::executed(value))
            .await?;
        self.recorder
            .append_audit(AuditEntry::new(
                state.ticket.ticket_id.clone(),
                Stage::Execute.audit_action(),
                Stage::Execute.agent(),
                json!({
                    "playbook": execution.playbook,
                    "status": execution.status,
                    "target_host": execution.target_host,
                }),
            ))
            .await?;

        state.execution_result = Some(execution);
        Ok(())
    }

    async fn validate_stage(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let Some(execution) = state.execution_result.as_ref() else {
            return Err(PipelineError::stage(
                Stage::Validate,
                "execution result missing from pipeline state",
            ));
        };
        let report = self
            .validator
            .validate(&state.ticket, execution)
            .await
            .map_err(|e| PipelineError::stage(Stage::Validate, e))?;
        let value = serde_json::to_value(&report)
            .map_err(|e| PipelineError::stage(Stage::Validate, e))?;

        state.push_message(format!("Validation completed: {}", report.overall_status));
        self.recorder
            .update_incident(&state.ticket.ticket_id, IncidentPatch::validated(value))
            .await?;
        self.recorder
            .append_audit(AuditEntry::new(
                state.ticket.ticket_id.clone(),
                Stage::Validate.audit_action(),
                Stage::Validate.agent(),
                json!({
                    "overall_status": report.overall_status,
                    "checks": report.checks,
                    "failed_checks": report.failed_checks,
                }),
            ))
            .await?;

        state.validation_report = Some(report);
        Ok(())
    }

    async fn update_stage(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let Some(report) = state.validation_report.as_ref() else {
            return Err(PipelineError::stage(
                Stage::Update,
                "validation report missing from pipeline state",
            ));
        };
        let response = self
            .updater
            .update(&state.ticket, report)
            .await
            .map_err(|e| PipelineError::stage(Stage::Update, e))?;
        let response_value = serde_json::to_value(&response)
            .map_err(|e| PipelineError::stage(Stage::Update, e))?;

        // Terminal status is the validation outcome; never a third value.
        let final_status = match report.overall_status {
            ValidationStatus::Success => IncidentStatus::Success,
            ValidationStatus::Failed => IncidentStatus::Failed,
        };

        state.push_message("Service desk ticket updated");
        self.recorder
            .update_incident(
                &state.ticket.ticket_id,
                IncidentPatch::completed(final_status, state.messages.clone()),
            )
            .await?;
        self.recorder
            .append_audit(AuditEntry::new(
                state.ticket.ticket_id.clone(),
                Stage::Update.audit_action(),
                Stage::Update.agent(),
                json!({
                    "final_status": final_status.as_str(),
                    "update_response": response_value,
                }),
            ))
            .await?;

        state.update_response = Some(response);
        Ok(())
    }

    /// Centralized error handler: the single place stage failures are
    /// recorded.
    ///
    /// Appends the formatted error to the run's error list, records a
    /// `<stage>_error` audit entry and the terminal failed status, both
    /// best-effort, and logs the failure. Secondary write failures are
    /// swallowed here so they cannot mask the primary error.
    async fn handle_stage_failure(
        &self,
        state: &mut PipelineState,
        stage: Stage,
        error: &PipelineError,
    ) {
        let error_msg = format!("{} failed: {}", stage.agent(), error);
        state.errors.push(error_msg.clone());

        self.recorder
            .append_audit_best_effort(AuditEntry::new(
                state.ticket.ticket_id.clone(),
                stage.error_action(),
                stage.agent(),
                json!({ "error": error_msg.as_str() }),
            ))
            .await;
        self.recorder
            .update_incident_best_effort(
                &state.ticket.ticket_id,
                IncidentPatch::failed(error_msg, state.messages.clone()),
            )
            .await;

        obs::emit_stage_failed(state.ticket.ticket_id.as_str(), stage.name(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;
    use incident_store::fakes::MemoryIncidentStore;
    use incident_store::TicketId;

    #[tokio::test]
    async fn null_input_is_invalid() {
        let pipeline = TicketPipeline::new(Arc::new(MemoryIncidentStore::new()));
        let err = pipeline.process_ticket(serde_json::Value::Null).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput));
    }

    #[tokio::test]
    async fn empty_object_is_invalid() {
        let pipeline = TicketPipeline::new(Arc::new(MemoryIncidentStore::new()));
        let err = pipeline.process_ticket(json!({})).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput));
    }

    #[tokio::test]
    async fn malformed_ticket_rejected_before_persistence() {
        let store = Arc::new(MemoryIncidentStore::new());
        let pipeline = TicketPipeline::new(store.clone());

        let err = pipeline
            .process_ticket(json!({"ticket_id": "INC-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTicket(_)));

        // Nothing was persisted for the rejected submission.
        let incident = store.get_incident(&TicketId::from("INC-1")).await.unwrap();
        assert!(incident.is_none());
        let trail = store.audit_trail(&TicketId::from("INC-1")).await.unwrap();
        assert!(trail.is_empty());
    }

    #[tokio::test]
    async fn completed_state_carries_all_results() {
        let pipeline = TicketPipeline::new(Arc::new(MemoryIncidentStore::new()));
        let state = pipeline
            .process_ticket(raw_ticket("INC0012345"))
            .await
            .unwrap();

        assert!(state.classification.is_some());
        assert!(state.execution_result.is_some());
        assert!(state.validation_report.is_some());
        assert!(state.update_response.is_some());
        assert!(state.errors.is_empty());
        assert_eq!(state.messages.len(), 5);
        assert_eq!(state.messages[0], "Ticket received and validated");
        assert_eq!(state.messages[4], "Service desk ticket updated");
    }
}
