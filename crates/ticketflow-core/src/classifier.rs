//! Classification collaborator: assigns a ticket its remediation category.

use async_trait::async_trait;
use incident_store::Priority;
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    ActionKind, ClassificationResult, ClassificationSource, MiddlewareType, RiskLevel, Ticket,
};

/// Errors raised by a classification collaborator.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The underlying decision source could not be reached.
    #[error("classification decision source unavailable: {0}")]
    SourceUnavailable(String),

    /// The decision source returned something that fails structural
    /// validation.
    #[error("classification produced an invalid result: {0}")]
    InvalidResult(String),
}

/// Classification collaborator interface.
///
/// Implementations must be deterministic: the same ticket content yields the
/// same category, so the audit trail stays reproducible. A degraded path is
/// permitted but must mark its results with
/// [`ClassificationSource::Fallback`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, ticket: &Ticket) -> Result<ClassificationResult, ClassifyError>;
}

/// Deterministic keyword-rule classifier.
///
/// Scans the ticket description for middleware and action keywords. When no
/// middleware keyword matches, it falls back to subcategory-derived defaults
/// and marks the result as fallback-sourced.
#[derive(Debug, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn risk_level(ticket: &Ticket) -> RiskLevel {
        let production = ticket.environment.eq_ignore_ascii_case("production");
        match (ticket.priority, production) {
            (Priority::High, _) | (_, true) => RiskLevel::High,
            (Priority::Medium, false) => RiskLevel::Medium,
            (Priority::Low, false) => RiskLevel::Low,
        }
    }

    fn action_for(description: &str) -> ActionKind {
        if description.contains("upgrade") {
            ActionKind::Upgrade
        } else {
            ActionKind::Install
        }
    }

    fn playbook_for(middleware: MiddlewareType, action: ActionKind) -> String {
        format!("{middleware}_{action}.yml")
    }

    fn estimated_duration(action: ActionKind) -> &'static str {
        match action {
            ActionKind::Install => "30min",
            ActionKind::Upgrade => "45min",
        }
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, ticket: &Ticket) -> Result<ClassificationResult, ClassifyError> {
        let description = ticket.description.to_lowercase();

        let (middleware_type, source) = if description.contains("apache") {
            (MiddlewareType::Apache, ClassificationSource::Rules)
        } else if description.contains("tomcat") {
            (MiddlewareType::Tomcat, ClassificationSource::Rules)
        } else {
            // No middleware keyword in the description: fall back to the
            // subcategory and keep the degraded path visible in the result.
            let subcategory = ticket.subcategory.to_lowercase();
            let middleware = if subcategory.contains("application") {
                MiddlewareType::Tomcat
            } else {
                MiddlewareType::Apache
            };
            (middleware, ClassificationSource::Fallback)
        };

        let action = Self::action_for(&description);
        let result = ClassificationResult {
            middleware_type,
            action,
            target_environment: ticket.environment.to_lowercase(),
            risk_level: Self::risk_level(ticket),
            playbook: Self::playbook_for(middleware_type, action),
            estimated_duration: Self::estimated_duration(action).to_string(),
            source,
        };

        debug!(
            ticket_id = %ticket.ticket_id,
            middleware = %result.middleware_type,
            action = %result.action,
            source = ?result.source,
            "ticket classified"
        );
        Ok(result)
    }
}
