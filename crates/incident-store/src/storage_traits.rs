//! Storage trait definitions for Ticketflow
//!
//! `IncidentStore` is the single persistence contract the pipeline engine
//! writes through. It covers two tables:
//! - `incidents`: one row per ticket, uniquely keyed by ticket id
//! - `audit_log`: append-only, many entries per ticket
//!
//! The trait is async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Identifiers and enums
// ---------------------------------------------------------------------------

/// Unique identifier for a ticket (and its incident row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        TicketId(s.to_string())
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an incident.
///
/// Transitions are strictly linear: `received → classified → executed →
/// validated → success | failed`. `failed` may also be entered directly from
/// any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Received,
    Classified,
    Executed,
    Validated,
    Success,
    Failed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Received => "received",
            IncidentStatus::Classified => "classified",
            IncidentStatus::Executed => "executed",
            IncidentStatus::Validated => "validated",
            IncidentStatus::Success => "success",
            IncidentStatus::Failed => "failed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "received" => Ok(IncidentStatus::Received),
            "classified" => Ok(IncidentStatus::Classified),
            "executed" => Ok(IncidentStatus::Executed),
            "validated" => Ok(IncidentStatus::Validated),
            "success" => Ok(IncidentStatus::Success),
            "failed" => Ok(IncidentStatus::Failed),
            other => Err(StoreError::Backend(format!(
                "unknown incident status: {other}"
            ))),
        }
    }

    /// Whether this status is terminal (no further stage may run).
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Success | IncidentStatus::Failed)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ticket priority. Raw submissions are accepted case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> StoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(StoreError::Backend(format!("unknown priority: {other}"))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Fields required to create a new incident row.
///
/// All other columns start at their initial values: status `received`,
/// structured results absent, empty message list, both timestamps set to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub environment: String,
}

/// Full incident record as read back from the store.
///
/// Structured results are `None` until the owning stage has persisted them;
/// absence means "no result yet", never an empty placeholder object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub status: IncidentStatus,
    pub classification: Option<serde_json::Value>,
    pub execution_result: Option<serde_json::Value>,
    pub validation_report: Option<serde_json::Value>,
    pub messages: Vec<String>,
    pub environment: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary fields returned by list queries.
///
/// Full payloads are deliberately excluded to keep listing cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub status: IncidentStatus,
    pub environment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Statically typed partial update for an incident row.
///
/// Every updatable column is an explicit field; a `None` leaves the column
/// untouched. `updated_at` is stamped by the store on every apply and is not
/// settable by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentPatch {
    pub status: Option<IncidentStatus>,
    pub classification: Option<serde_json::Value>,
    pub execution_result: Option<serde_json::Value>,
    pub validation_report: Option<serde_json::Value>,
    pub messages: Option<Vec<String>>,
    pub error: Option<String>,
}

impl IncidentPatch {
    /// Patch recording a completed classification stage.
    pub fn classified(classification: serde_json::Value) -> Self {
        Self {
            status: Some(IncidentStatus::Classified),
            classification: Some(classification),
            ..Default::default()
        }
    }

    /// Patch recording a completed execution stage.
    pub fn executed(execution_result: serde_json::Value) -> Self {
        Self {
            status: Some(IncidentStatus::Executed),
            execution_result: Some(execution_result),
            ..Default::default()
        }
    }

    /// Patch recording a completed validation stage.
    pub fn validated(validation_report: serde_json::Value) -> Self {
        Self {
            status: Some(IncidentStatus::Validated),
            validation_report: Some(validation_report),
            ..Default::default()
        }
    }

    /// Terminal patch after the update stage: status is the validation
    /// outcome, messages are the full progress trail.
    pub fn completed(outcome: IncidentStatus, messages: Vec<String>) -> Self {
        Self {
            status: Some(outcome),
            messages: Some(messages),
            ..Default::default()
        }
    }

    /// Terminal patch for a failed run: error string plus the partial
    /// message trail accumulated before the failure.
    pub fn failed(error: String, messages: Vec<String>) -> Self {
        Self {
            status: Some(IncidentStatus::Failed),
            messages: Some(messages),
            error: Some(error),
            ..Default::default()
        }
    }
}

/// A single immutable entry in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ticket_id: TicketId,
    /// Action name: stage name + outcome, e.g. `ticket_classified`,
    /// `classify_error`.
    pub action: String,
    /// Acting component name, e.g. `ticket_classifier`.
    pub agent: String,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        ticket_id: TicketId,
        action: impl Into<String>,
        agent: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            ticket_id,
            action: action.into(),
            agent: agent.into(),
            timestamp: Utc::now(),
            details,
        }
    }
}

// ---------------------------------------------------------------------------
// IncidentStore
// ---------------------------------------------------------------------------

/// Incident and audit persistence.
///
/// Guarantees:
/// - `ticket_id` is unique across incidents; creation fails rather than
///   overwrites.
/// - Every mutation advances `updated_at`, and `updated_at >= created_at`
///   always holds.
/// - Audit entries are append-only; they are never updated or deleted.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert a new incident row with status `received`.
    ///
    /// Fails with [`StoreError::DuplicateTicket`] if the ticket id already
    /// exists; the existing row is left unchanged.
    async fn create_incident(&self, incident: NewIncident) -> StoreResult<()>;

    /// Apply a typed partial update. Always stamps `updated_at`.
    ///
    /// Fails with [`StoreError::TicketNotFound`] if no row exists and
    /// [`StoreError::Unavailable`] if the backend cannot be reached; both
    /// propagate to the caller.
    async fn update_incident(&self, ticket_id: &TicketId, patch: IncidentPatch)
        -> StoreResult<()>;

    /// Fetch a full incident. Returns `Ok(None)` when absent.
    async fn get_incident(&self, ticket_id: &TicketId) -> StoreResult<Option<Incident>>;

    /// List incident summaries, newest created first.
    async fn list_incidents(&self, limit: usize, offset: usize)
        -> StoreResult<Vec<IncidentSummary>>;

    /// Append one audit entry. Insert-only; failures are reported, never
    /// swallowed at this layer.
    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()>;

    /// All audit entries for a ticket, newest first.
    async fn audit_trail(&self, ticket_id: &TicketId) -> StoreResult<Vec<AuditEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            IncidentStatus::Received,
            IncidentStatus::Classified,
            IncidentStatus::Executed,
            IncidentStatus::Validated,
            IncidentStatus::Success,
            IncidentStatus::Failed,
        ] {
            assert_eq!(IncidentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(IncidentStatus::parse("bogus").is_err());
    }

    #[test]
    fn only_outcomes_are_terminal() {
        assert!(IncidentStatus::Success.is_terminal());
        assert!(IncidentStatus::Failed.is_terminal());
        assert!(!IncidentStatus::Received.is_terminal());
        assert!(!IncidentStatus::Validated.is_terminal());
    }

    #[test]
    fn priority_parse_is_case_insensitive() {
        assert_eq!(Priority::parse("High").unwrap(), Priority::High);
        assert_eq!(Priority::parse("medium").unwrap(), Priority::Medium);
        assert_eq!(Priority::parse("LOW").unwrap(), Priority::Low);
        assert!(Priority::parse("urgent").is_err());
    }

    #[test]
    fn patch_constructors_set_status() {
        let patch = IncidentPatch::classified(serde_json::json!({"action": "install"}));
        assert_eq!(patch.status, Some(IncidentStatus::Classified));
        assert!(patch.classification.is_some());
        assert!(patch.execution_result.is_none());

        let patch = IncidentPatch::failed("boom".to_string(), vec![]);
        assert_eq!(patch.status, Some(IncidentStatus::Failed));
        assert_eq!(patch.error.as_deref(), Some("boom"));
    }
}
