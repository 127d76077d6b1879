//! Guarded persistence: bridges the engine to the [`IncidentStore`] with the
//! error-isolation discipline the pipeline relies on.
//!
//! Two write disciplines exist, and the split is deliberate:
//! - **guarded**: failure is logged with the wrapped operation's name,
//!   wrapped into [`PipelineError::Persistence`] and re-raised; the engine
//!   decides whether that is fatal for the current stage.
//! - **best-effort**: failure is logged and swallowed. Used only on the
//!   error-handling path, so a secondary bookkeeping failure can never mask
//!   the primary stage failure or raise a second error out of the run.
//!
//! Neither discipline retries, and neither converts a storage error into a
//! different failure mode than documented here.

use std::sync::Arc;

use incident_store::{AuditEntry, IncidentPatch, IncidentStore, NewIncident, StoreError, TicketId};

use crate::domain::PipelineError;
use crate::obs;

/// Wraps every store mutation performed by the pipeline engine.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn IncidentStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self { store }
    }

    /// Guarded incident creation.
    ///
    /// `DuplicateTicket` passes through as the domain-level duplicate
    /// rejection; any other failure becomes [`PipelineError::Persistence`].
    pub async fn create_incident(&self, incident: NewIncident) -> Result<(), PipelineError> {
        let ticket_id = incident.ticket_id.clone();
        match self.store.create_incident(incident).await {
            Ok(()) => Ok(()),
            Err(StoreError::DuplicateTicket { ticket_id }) => {
                Err(PipelineError::DuplicateTicket(ticket_id))
            }
            Err(source) => Err(self.persistence_failure("create_incident", &ticket_id, source)),
        }
    }

    /// Guarded incident update.
    pub async fn update_incident(
        &self,
        ticket_id: &TicketId,
        patch: IncidentPatch,
    ) -> Result<(), PipelineError> {
        self.store
            .update_incident(ticket_id, patch)
            .await
            .map_err(|source| self.persistence_failure("update_incident", ticket_id, source))
    }

    /// Guarded audit append.
    pub async fn append_audit(&self, entry: AuditEntry) -> Result<(), PipelineError> {
        let ticket_id = entry.ticket_id.clone();
        self.store
            .append_audit(entry)
            .await
            .map_err(|source| self.persistence_failure("append_audit", &ticket_id, source))
    }

    /// Best-effort audit append for the error-handling path.
    ///
    /// A failure here is logged and swallowed: it must never overwrite the
    /// primary error or escape the run.
    pub async fn append_audit_best_effort(&self, entry: AuditEntry) {
        let ticket_id = entry.ticket_id.clone();
        if let Err(err) = self.store.append_audit(entry).await {
            obs::emit_best_effort_write_dropped("append_audit", ticket_id.as_str(), &err);
        }
    }

    /// Best-effort incident update for the error-handling path.
    pub async fn update_incident_best_effort(&self, ticket_id: &TicketId, patch: IncidentPatch) {
        if let Err(err) = self.store.update_incident(ticket_id, patch).await {
            obs::emit_best_effort_write_dropped("update_incident", ticket_id.as_str(), &err);
        }
    }

    fn persistence_failure(
        &self,
        operation: &'static str,
        ticket_id: &TicketId,
        source: StoreError,
    ) -> PipelineError {
        obs::emit_persistence_failed(operation, ticket_id.as_str(), &source);
        PipelineError::Persistence { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_store::fakes::FlakyIncidentStore;
    use incident_store::Priority;

    fn new_incident(ticket_id: &str) -> NewIncident {
        NewIncident {
            ticket_id: TicketId::from(ticket_id),
            priority: Priority::Medium,
            environment: "staging".to_string(),
        }
    }

    fn entry(ticket_id: &str) -> AuditEntry {
        AuditEntry::new(
            TicketId::from(ticket_id),
            "ticket_received",
            "ticket_receiver",
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn duplicate_create_maps_to_domain_error() {
        let store = Arc::new(FlakyIncidentStore::new());
        let recorder = AuditRecorder::new(store);

        recorder.create_incident(new_incident("INC-1")).await.unwrap();
        let err = recorder
            .create_incident(new_incident("INC-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateTicket(id) if id == "INC-1"));
    }

    #[tokio::test]
    async fn guarded_update_wraps_store_failure() {
        let store = Arc::new(FlakyIncidentStore::new());
        let recorder = AuditRecorder::new(store.clone());
        recorder.create_incident(new_incident("INC-1")).await.unwrap();

        store.fail_updates(true);
        let err = recorder
            .update_incident(&TicketId::from("INC-1"), IncidentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence {
                operation: "update_incident",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn guarded_audit_wraps_store_failure() {
        let store = Arc::new(FlakyIncidentStore::new());
        let recorder = AuditRecorder::new(store.clone());

        store.fail_audit_appends(true);
        let err = recorder.append_audit(entry("INC-1")).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence {
                operation: "append_audit",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn best_effort_append_swallows_failure() {
        let store = Arc::new(FlakyIncidentStore::new());
        let recorder = AuditRecorder::new(store.clone());

        store.fail_audit_appends(true);
        // Must not panic or propagate anything.
        recorder.append_audit_best_effort(entry("INC-1")).await;

        // And with the failure cleared, the entry lands normally.
        store.fail_audit_appends(false);
        recorder.append_audit_best_effort(entry("INC-1")).await;
        let trail = store.audit_trail(&TicketId::from("INC-1")).await.unwrap();
        assert_eq!(trail.len(), 1);
    }

    #[tokio::test]
    async fn best_effort_update_swallows_failure() {
        let store = Arc::new(FlakyIncidentStore::new());
        let recorder = AuditRecorder::new(store.clone());

        store.fail_updates(true);
        recorder
            .update_incident_best_effort(&TicketId::from("INC-404"), IncidentPatch::default())
            .await;
    }
}
