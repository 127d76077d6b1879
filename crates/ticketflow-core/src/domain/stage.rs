//! Pipeline stage definitions.

use serde::{Deserialize, Serialize};

/// The ordered processing steps of a ticket run.
///
/// `Receive` covers ingestion (incident creation); the remaining four are
/// the pipeline proper and execute strictly in declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Receive,
    Classify,
    Execute,
    Validate,
    Update,
}

impl Stage {
    /// The four post-ingestion stages, in execution order.
    pub const PIPELINE: [Stage; 4] = [
        Stage::Classify,
        Stage::Execute,
        Stage::Validate,
        Stage::Update,
    ];

    /// Stage name as used in error audit actions (`classify_error`).
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Receive => "receive",
            Stage::Classify => "classify",
            Stage::Execute => "execute",
            Stage::Validate => "validate",
            Stage::Update => "update",
        }
    }

    /// Acting component name recorded in audit entries.
    pub fn agent(&self) -> &'static str {
        match self {
            Stage::Receive => "ticket_receiver",
            Stage::Classify => "ticket_classifier",
            Stage::Execute => "ticket_executor",
            Stage::Validate => "ticket_validator",
            Stage::Update => "ticket_updater",
        }
    }

    /// Audit action recorded when the stage completes successfully.
    pub fn audit_action(&self) -> &'static str {
        match self {
            Stage::Receive => "ticket_received",
            Stage::Classify => "ticket_classified",
            Stage::Execute => "playbook_executed",
            Stage::Validate => "execution_validated",
            Stage::Update => "ticket_updated",
        }
    }

    /// Audit action recorded when the stage fails.
    pub fn error_action(&self) -> String {
        format!("{}_error", self.name())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_is_fixed() {
        assert_eq!(
            Stage::PIPELINE,
            [
                Stage::Classify,
                Stage::Execute,
                Stage::Validate,
                Stage::Update
            ]
        );
    }

    #[test]
    fn audit_actions_match_stage() {
        assert_eq!(Stage::Receive.audit_action(), "ticket_received");
        assert_eq!(Stage::Classify.audit_action(), "ticket_classified");
        assert_eq!(Stage::Execute.audit_action(), "playbook_executed");
        assert_eq!(Stage::Validate.audit_action(), "execution_validated");
        assert_eq!(Stage::Update.audit_action(), "ticket_updated");
    }

    #[test]
    fn error_actions_use_stage_name() {
        assert_eq!(Stage::Classify.error_action(), "classify_error");
        assert_eq!(Stage::Update.error_action(), "update_error");
    }

    #[test]
    fn agents_are_component_names() {
        assert_eq!(Stage::Classify.agent(), "ticket_classifier");
        assert_eq!(Stage::Validate.agent(), "ticket_validator");
    }
}
