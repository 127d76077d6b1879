//! Collaborator-facing boundary for the surrounding CLI/HTTP/UI layers.
//!
//! Thin facade over the pipeline engine and the store's read paths. Submission
//! can be synchronous (caller gets the final state) or fire-and-forget
//! (caller gets a receipt and polls [`TicketService::get_status`]).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use incident_store::{
    AuditEntry, Incident, IncidentStatus, IncidentStore, IncidentSummary, StoreResult, TicketId,
};
use serde::Serialize;
use tracing::{error, info};

use crate::domain::{PipelineError, Ticket};
use crate::pipeline::TicketPipeline;
use crate::state::PipelineState;

/// Boundary configuration, overridable from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Hard cap on list page size.
    pub max_list_limit: usize,
    /// Page size used when the caller does not pass one.
    pub default_list_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_list_limit: 1000,
            default_list_limit: 100,
        }
    }
}

impl ServiceConfig {
    /// Read overrides from `TICKETFLOW_MAX_LIST_LIMIT` and
    /// `TICKETFLOW_DEFAULT_LIST_LIMIT`; unparseable values fall back to
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_list_limit: env_usize("TICKETFLOW_MAX_LIST_LIMIT")
                .unwrap_or(defaults.max_list_limit),
            default_list_limit: env_usize("TICKETFLOW_DEFAULT_LIST_LIMIT")
                .unwrap_or(defaults.default_list_limit),
        }
    }

    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_list_limit)
            .min(self.max_list_limit)
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

/// Acknowledgement returned by a fire-and-forget submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub ticket_id: TicketId,
    pub status: String,
    pub message: String,
}

/// Lightweight status view for polling callers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub ticket_id: TicketId,
    pub status: IncidentStatus,
    pub last_update: DateTime<Utc>,
}

/// Incident plus its full audit trail (newest first).
#[derive(Debug, Clone, Serialize)]
pub struct IncidentHistory {
    pub incident: Incident,
    pub audit: Vec<AuditEntry>,
}

/// Boundary facade over the pipeline and store.
pub struct TicketService {
    pipeline: Arc<TicketPipeline>,
    store: Arc<dyn IncidentStore>,
    config: ServiceConfig,
}

impl TicketService {
    pub fn new(pipeline: Arc<TicketPipeline>, store: Arc<dyn IncidentStore>) -> Self {
        Self::with_config(pipeline, store, ServiceConfig::default())
    }

    pub fn with_config(
        pipeline: Arc<TicketPipeline>,
        store: Arc<dyn IncidentStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            pipeline,
            store,
            config,
        }
    }

    /// Synchronous submission: runs the full pipeline before returning.
    pub async fn submit(&self, raw: serde_json::Value) -> Result<PipelineState, PipelineError> {
        self.pipeline.process_ticket(raw).await
    }

    /// Fire-and-forget submission.
    ///
    /// Malformed and duplicate tickets are rejected synchronously with the
    /// specific reason; accepted tickets run on a spawned task and the caller
    /// polls [`Self::get_status`] for progress.
    pub async fn submit_background(
        &self,
        raw: serde_json::Value,
    ) -> Result<SubmitReceipt, PipelineError> {
        if raw.is_null() || raw.as_object().is_some_and(|o| o.is_empty()) {
            return Err(PipelineError::InvalidInput);
        }
        let ticket = Ticket::from_value(&raw)?;

        // Synchronous duplicate rejection; a race slipping past this check is
        // still caught by the store's uniqueness constraint inside the run.
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

        let pipeline = self.pipeline.clone();
        let ticket_id = ticket.ticket_id.clone();
        let task_ticket_id = ticket_id.clone();
        tokio::spawn(async move {
            match pipeline.process_ticket(raw).await {
                Ok(state) => {
                    info!(
                        ticket_id = %task_ticket_id,
                        messages = state.messages.len(),
                        "background run completed"
                    );
                }
                Err(err) => {
                    // The engine has already recorded the terminal failed
                    // status; nothing is waiting on this task's result.
                    error!(ticket_id = %task_ticket_id, error = %err, "background run failed");
                }
            }
        });

        Ok(SubmitReceipt {
            ticket_id,
            status: "processing_started".to_string(),
            message: "ticket accepted; poll status for progress".to_string(),
        })
    }

    /// Lightweight status for polling. `Ok(None)` when the ticket is unknown.
    pub async fn get_status(&self, ticket_id: &TicketId) -> StoreResult<Option<StatusView>> {
        Ok(self
            .store
            .get_incident(ticket_id)
            .await?
            .map(|incident| StatusView {
                ticket_id: incident.ticket_id,
                status: incident.status,
                last_update: incident.updated_at,
            }))
    }

    /// Full incident record. `Ok(None)` when the ticket is unknown.
    pub async fn get_full(&self, ticket_id: &TicketId) -> StoreResult<Option<Incident>> {
        self.store.get_incident(ticket_id).await
    }

    /// Paginated summaries, newest created first. The limit is clamped to
    /// the configured maximum.
    pub async fn list_summaries(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<Vec<IncidentSummary>> {
        let limit = self.config.clamp_limit(limit);
        self.store.list_incidents(limit, offset).await
    }

    /// Incident plus audit trail. `Ok(None)` when the ticket is unknown.
    pub async fn get_history(&self, ticket_id: &TicketId) -> StoreResult<Option<IncidentHistory>> {
        let Some(incident) = self.store.get_incident(ticket_id).await? else {
            return Ok(None);
        };
        let audit = self.store.audit_trail(ticket_id).await?;
        Ok(Some(IncidentHistory { incident, audit }))
    }

    /// Connectivity probe for health checks: any successful read qualifies.
    pub async fn healthy(&self) -> StoreResult<()> {
        self.store
            .get_incident(&TicketId::from("healthcheck"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;
    use incident_store::fakes::MemoryIncidentStore;

    fn service() -> (TicketService, Arc<MemoryIncidentStore>) {
        let store = Arc::new(MemoryIncidentStore::new());
        let pipeline = Arc::new(TicketPipeline::new(store.clone()));
        (TicketService::new(pipeline, store.clone()), store)
    }

    #[tokio::test]
    async fn submit_runs_to_completion() {
        let (service, _) = service();
        let state = service.submit(raw_ticket("INC-1")).await.unwrap();
        assert_eq!(state.messages.len(), 5);

        let status = service
            .get_status(&TicketId::from("INC-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, IncidentStatus::Success);
    }

    #[tokio::test]
    async fn background_submit_rejects_duplicates_synchronously() {
        let (service, _) = service();
        service.submit(raw_ticket("INC-1")).await.unwrap();

        let err = service
            .submit_background(raw_ticket("INC-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateTicket(id) if id == "INC-1"));
    }

    #[tokio::test]
    async fn background_submit_is_pollable() {
        let (service, _) = service();
        let receipt = service.submit_background(raw_ticket("INC-1")).await.unwrap();
        assert_eq!(receipt.status, "processing_started");

        // Poll until the run reaches a terminal status.
        let mut status = None;
        for _ in 0..100 {
            if let Some(view) = service.get_status(&TicketId::from("INC-1")).await.unwrap() {
                if view.status.is_terminal() {
                    status = Some(view.status);
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(status, Some(IncidentStatus::Success));
    }

    #[tokio::test]
    async fn unknown_ticket_reads_are_none() {
        let (service, _) = service();
        let missing = TicketId::from("INC-404");

        assert!(service.get_status(&missing).await.unwrap().is_none());
        assert!(service.get_full(&missing).await.unwrap().is_none());
        assert!(service.get_history(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_pairs_incident_with_trail() {
        let (service, _) = service();
        service.submit(raw_ticket("INC-1")).await.unwrap();

        let history = service
            .get_history(&TicketId::from("INC-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.incident.status, IncidentStatus::Success);
        assert_eq!(history.audit.len(), 5);
        // Newest first.
        assert_eq!(history.audit[0].action, "ticket_updated");
        assert_eq!(history.audit[4].action, "ticket_received");
    }

    #[tokio::test]
    async fn list_limit_is_clamped() {
        let config = ServiceConfig {
            max_list_limit: 2,
            default_list_limit: 1,
        };
        let store = Arc::new(MemoryIncidentStore::new());
        let pipeline = Arc::new(TicketPipeline::new(store.clone()));
        let service = TicketService::with_config(pipeline, store, config);

        for id in ["INC-1", "INC-2", "INC-3"] {
            service.submit(raw_ticket(id)).await.unwrap();
        }

        // Requested 10, clamped to 2.
        let page = service.list_summaries(Some(10), 0).await.unwrap();
        assert_eq!(page.len(), 2);

        // No limit given: default of 1 applies.
        let page = service.list_summaries(None, 0).await.unwrap();
        assert_eq!(page.len(), 1);
    }
}
