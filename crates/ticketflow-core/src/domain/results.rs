//! Typed stage result payloads.
//!
//! Each stage owns exactly one of these types. The engine persists them as
//! JSON values without interpreting their contents; only the collaborators
//! and the validation outcome mapping look inside.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Middleware product a ticket targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiddlewareType {
    Apache,
    Tomcat,
}

impl std::fmt::Display for MiddlewareType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareType::Apache => write!(f, "apache"),
            MiddlewareType::Tomcat => write!(f, "tomcat"),
        }
    }
}

/// Remediation action a ticket requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Install,
    Upgrade,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Install => write!(f, "install"),
            ActionKind::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Risk assessment derived from ticket priority and target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Which decision path produced a classification.
///
/// `Fallback` marks results produced by the degraded rule set so the audit
/// trail can distinguish them from primary-path classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Rules,
    Fallback,
}

/// Output of the classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub middleware_type: MiddlewareType,
    pub action: ActionKind,
    pub target_environment: String,
    pub risk_level: RiskLevel,
    pub playbook: String,
    pub estimated_duration: String,
    pub source: ClassificationSource,
}

/// Output of the execution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: String,
    pub playbook: String,
    pub target_host: String,
    pub execution_time: String,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub logs: String,
}

/// Validation outcome. Exactly two values exist; a third state is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Success => write!(f, "success"),
            ValidationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Output of the validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ticket_id: String,
    /// Conjunction of all individual checks.
    pub overall_status: ValidationStatus,
    /// Check name → pass/fail. BTreeMap keeps serialization deterministic.
    pub checks: BTreeMap<String, bool>,
    /// Names of the checks that failed (empty when all pass).
    pub failed_checks: Vec<String>,
    pub validation_time: String,
    pub recommendations: String,
}

impl ValidationReport {
    /// Derive the report from independent check results.
    pub fn from_checks(ticket_id: String, checks: BTreeMap<String, bool>) -> Self {
        let failed_checks: Vec<String> = checks
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.clone())
            .collect();
        let overall_status = if failed_checks.is_empty() {
            ValidationStatus::Success
        } else {
            ValidationStatus::Failed
        };
        let recommendations = if failed_checks.is_empty() {
            "All checks passed. System is ready for production use.".to_string()
        } else {
            format!(
                "Failed checks: {}. Manual intervention required.",
                failed_checks.join(", ")
            )
        };
        Self {
            ticket_id,
            overall_status,
            checks,
            failed_checks,
            validation_time: "5min".to_string(),
            recommendations,
        }
    }
}

/// Completion status reported to the external ticketing system.
///
/// Maps one-to-one from [`ValidationStatus`]; no third state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
    Failed,
}

impl From<ValidationStatus> for CompletionStatus {
    fn from(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Success => CompletionStatus::Completed,
            ValidationStatus::Failed => CompletionStatus::Failed,
        }
    }
}

/// Output of the update stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub ticket_id: String,
    pub status: CompletionStatus,
    pub resolution_notes: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn all_passing_checks_yield_success() {
        let report = ValidationReport::from_checks(
            "INC-1".to_string(),
            checks(&[("service_status", true), ("port_connectivity", true)]),
        );
        assert_eq!(report.overall_status, ValidationStatus::Success);
        assert!(report.failed_checks.is_empty());
        assert!(report.recommendations.contains("All checks passed"));
    }

    #[test]
    fn any_failing_check_yields_failed_and_is_listed() {
        let report = ValidationReport::from_checks(
            "INC-1".to_string(),
            checks(&[
                ("service_status", true),
                ("port_connectivity", false),
                ("configuration_valid", false),
            ]),
        );
        assert_eq!(report.overall_status, ValidationStatus::Failed);
        assert_eq!(
            report.failed_checks,
            vec!["configuration_valid", "port_connectivity"]
        );
        assert!(report.recommendations.contains("port_connectivity"));
    }

    #[test]
    fn completion_status_maps_without_third_state() {
        assert_eq!(
            CompletionStatus::from(ValidationStatus::Success),
            CompletionStatus::Completed
        );
        assert_eq!(
            CompletionStatus::from(ValidationStatus::Failed),
            CompletionStatus::Failed
        );
    }

    #[test]
    fn classification_serializes_with_source_marker() {
        let result = ClassificationResult {
            middleware_type: MiddlewareType::Apache,
            action: ActionKind::Install,
            target_environment: "production".to_string(),
            risk_level: RiskLevel::High,
            playbook: "apache_install.yml".to_string(),
            estimated_duration: "30min".to_string(),
            source: ClassificationSource::Fallback,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["middleware_type"], "apache");
        assert_eq!(value["source"], "fallback");
    }
}
