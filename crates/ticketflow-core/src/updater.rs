//! Update collaborator: reports the final outcome to the external
//! ticketing system.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::domain::{CompletionStatus, Ticket, UpdateResponse, ValidationReport, ValidationStatus};

/// Errors raised by an update collaborator.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("ticketing system rejected the update: {0}")]
    Rejected(String),

    #[error("ticketing system unreachable: {0}")]
    Unreachable(String),
}

/// Update collaborator interface.
///
/// Implementations map the validation outcome onto the external system's
/// completion status one-to-one; inventing a third state is not possible by
/// construction ([`CompletionStatus`] has two variants).
#[async_trait]
pub trait Updater: Send + Sync {
    async fn update(
        &self,
        ticket: &Ticket,
        report: &ValidationReport,
    ) -> Result<UpdateResponse, UpdateError>;
}

/// Simulated service-desk updater.
///
/// Builds the completion payload the real integration would send and returns
/// the acknowledgement locally. A live integration only needs another
/// [`Updater`] impl.
#[derive(Debug, Default)]
pub struct ServiceDeskUpdater;

impl ServiceDeskUpdater {
    pub fn new() -> Self {
        Self
    }

    fn resolution_notes(report: &ValidationReport) -> String {
        match report.overall_status {
            ValidationStatus::Success => format!(
                "Middleware change completed successfully. All validation checks passed. {}",
                report.recommendations
            ),
            ValidationStatus::Failed => format!(
                "Middleware change failed validation. {}",
                report.recommendations
            ),
        }
    }
}

#[async_trait]
impl Updater for ServiceDeskUpdater {
    async fn update(
        &self,
        ticket: &Ticket,
        report: &ValidationReport,
    ) -> Result<UpdateResponse, UpdateError> {
        let status = CompletionStatus::from(report.overall_status);
        info!(
            ticket_id = %ticket.ticket_id,
            status = ?status,
            "updating external ticket"
        );

        Ok(UpdateResponse {
            ticket_id: ticket.ticket_id.to_string(),
            status,
            resolution_notes: Self::resolution_notes(report),
            updated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;
    use std::collections::BTreeMap;

    fn report(overall: bool) -> ValidationReport {
        let mut checks = BTreeMap::new();
        checks.insert("service_status".to_string(), overall);
        ValidationReport::from_checks("INC0012345".to_string(), checks)
    }

    #[tokio::test]
    async fn success_maps_to_completed() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let response = ServiceDeskUpdater::new()
            .update(&ticket, &report(true))
            .await
            .unwrap();

        assert_eq!(response.status, CompletionStatus::Completed);
        assert!(response.resolution_notes.contains("completed successfully"));
    }

    #[tokio::test]
    async fn failure_maps_to_failed() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let response = ServiceDeskUpdater::new()
            .update(&ticket, &report(false))
            .await
            .unwrap();

        assert_eq!(response.status, CompletionStatus::Failed);
        assert!(response.resolution_notes.contains("failed validation"));
    }
}
