//! Execution collaborator: runs the remediation playbook for a ticket.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::{ClassificationResult, ExecutionResult, Ticket};

/// Errors raised by an execution collaborator.
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// The classification named a playbook this executor does not know.
    /// Rejected before any execution is attempted.
    #[error("no playbook registered for `{0}`")]
    UnknownPlaybook(String),

    /// The playbook started but did not complete.
    #[error("playbook execution failed: {0}")]
    ExecutionFailed(String),
}

/// Execution collaborator interface.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        ticket: &Ticket,
        classification: &ClassificationResult,
    ) -> Result<ExecutionResult, ExecuteError>;
}

/// Playbooks this executor can run. Anything else is rejected up front.
const KNOWN_PLAYBOOKS: [&str; 4] = [
    "apache_install.yml",
    "apache_upgrade.yml",
    "tomcat_install.yml",
    "tomcat_upgrade.yml",
];

/// Simulated playbook executor.
///
/// Validates the playbook against the registered set, then produces a
/// deterministic execution result. Real automation is a collaborator concern;
/// swapping in a live runner only requires another [`Executor`] impl.
#[derive(Debug)]
pub struct PlaybookExecutor {
    playbook_root: String,
}

impl Default for PlaybookExecutor {
    fn default() -> Self {
        Self {
            playbook_root: "./playbooks".to_string(),
        }
    }
}

impl PlaybookExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playbook_root(root: impl Into<String>) -> Self {
        Self {
            playbook_root: root.into(),
        }
    }
}

#[async_trait]
impl Executor for PlaybookExecutor {
    async fn execute(
        &self,
        ticket: &Ticket,
        classification: &ClassificationResult,
    ) -> Result<ExecutionResult, ExecuteError> {
        let playbook = classification.playbook.as_str();
        if !KNOWN_PLAYBOOKS.contains(&playbook) {
            return Err(ExecuteError::UnknownPlaybook(playbook.to_string()));
        }

        let playbook_path = format!("{}/{}", self.playbook_root, playbook);
        info!(
            ticket_id = %ticket.ticket_id,
            playbook = %playbook_path,
            target = %ticket.ci_name,
            "executing playbook"
        );

        Ok(ExecutionResult {
            status: "success".to_string(),
            playbook: playbook_path,
            target_host: ticket.ci_name.clone(),
            execution_time: "15min".to_string(),
            tasks_completed: 5,
            tasks_failed: 0,
            logs: format!(
                "Playbook {} completed on {}: 5 tasks ok, 0 failed",
                playbook, ticket.ci_name
            ),
        })
    }
}
