//! Validation collaborator: post-execution health checks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ExecutionResult, Ticket, ValidationReport};

/// Errors raised by a validation collaborator.
///
/// Note: failing checks are NOT an error. A report with
/// `overall_status = failed` is a successful validation; this error means the
/// checks themselves could not be run.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("validation could not be completed: {0}")]
    Inconclusive(String),
}

/// Validation collaborator interface.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        ticket: &Ticket,
        execution: &ExecutionResult,
    ) -> Result<ValidationReport, ValidateError>;
}

/// Deterministic checklist validator.
///
/// Runs four independent checks and derives `overall_status` as their
/// conjunction. Each check inspects only the execution result, so the same
/// execution always yields the same report.
#[derive(Debug, Default)]
pub struct ChecklistValidator;

impl ChecklistValidator {
    pub fn new() -> Self {
        Self
    }

    /// Did the playbook leave the service running (no failed tasks)?
    fn check_service_status(execution: &ExecutionResult) -> bool {
        execution.tasks_failed == 0
    }

    /// Did the playbook itself report success?
    fn check_port_connectivity(execution: &ExecutionResult) -> bool {
        execution.status == "success"
    }

    /// Were all configuration tasks applied?
    fn check_configuration(execution: &ExecutionResult) -> bool {
        execution.tasks_completed > 0
    }

    /// Scan execution logs for failure markers.
    fn check_logs(execution: &ExecutionResult) -> bool {
        let logs = execution.logs.to_lowercase();
        !(logs.contains("error") || logs.contains("fatal") || logs.contains("traceback"))
    }
}

#[async_trait]
impl Validator for ChecklistValidator {
    async fn validate(
        &self,
        ticket: &Ticket,
        execution: &ExecutionResult,
    ) -> Result<ValidationReport, ValidateError> {
        let mut checks = BTreeMap::new();
        checks.insert(
            "service_status".to_string(),
            Self::check_service_status(execution),
        );
        checks.insert(
            "port_connectivity".to_string(),
            Self::check_port_connectivity(execution),
        );
        checks.insert(
            "configuration_valid".to_string(),
            Self::check_configuration(execution),
        );
        checks.insert("log_analysis".to_string(), Self::check_logs(execution));

        let report = ValidationReport::from_checks(ticket.ticket_id.to_string(), checks);
        debug!(
            ticket_id = %ticket.ticket_id,
            overall = %report.overall_status,
            failed = report.failed_checks.len(),
            "validation completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;
    use crate::domain::ValidationStatus;

    fn execution() -> ExecutionResult {
        ExecutionResult {
            status: "success".to_string(),
            playbook: "./playbooks/apache_install.yml".to_string(),
            target_host: "web-server-prod-01".to_string(),
            execution_time: "15min".to_string(),
            tasks_completed: 5,
            tasks_failed: 0,
            logs: "Playbook completed: 5 tasks ok, 0 failed".to_string(),
        }
    }

    #[tokio::test]
    async fn clean_execution_validates_successfully() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let report = ChecklistValidator::new()
            .validate(&ticket, &execution())
            .await
            .unwrap();

        assert_eq!(report.overall_status, ValidationStatus::Success);
        assert_eq!(report.checks.len(), 4);
        assert!(report.failed_checks.is_empty());
        assert_eq!(report.ticket_id, "INC0012345");
    }

    #[tokio::test]
    async fn failed_tasks_fail_validation_and_name_the_check() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let mut exec = execution();
        exec.tasks_failed = 2;

        let report = ChecklistValidator::new()
            .validate(&ticket, &exec)
            .await
            .unwrap();
        assert_eq!(report.overall_status, ValidationStatus::Failed);
        assert!(report
            .failed_checks
            .contains(&"service_status".to_string()));
    }

    #[tokio::test]
    async fn error_markers_in_logs_fail_log_analysis() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let mut exec = execution();
        exec.logs = "Task 3 ERROR: connection refused".to_string();

        let report = ChecklistValidator::new()
            .validate(&ticket, &exec)
            .await
            .unwrap();
        assert_eq!(report.overall_status, ValidationStatus::Failed);
        assert_eq!(report.failed_checks, vec!["log_analysis"]);
        assert!(report.recommendations.contains("log_analysis"));
    }

    #[tokio::test]
    async fn validation_is_deterministic() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let validator = ChecklistValidator::new();

        let first = validator.validate(&ticket, &execution()).await.unwrap();
        let second = validator.validate(&ticket, &execution()).await.unwrap();
        assert_eq!(first, second);
    }
}
