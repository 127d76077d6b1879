//! Schema definitions for Ticketflow SurrealDB tables
//!
//! Tables:
//! - incidents: one row per ticket (unique ticket_id)
//! - audit_log: append-only action trail, many rows per ticket

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

use crate::storage_traits::{AuditEntry, NewIncident, TicketId};

/// Incident row stored in SurrealDB.
///
/// Enum-typed fields (priority, status) are persisted as their string forms;
/// conversion back to trait types happens at the store boundary. Structured
/// results are nullable: absent means "no result yet".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub ticket_id: String,
    pub priority: String,
    pub status: String,
    pub classification: Option<serde_json::Value>,
    pub execution_result: Option<serde_json::Value>,
    pub validation_report: Option<serde_json::Value>,
    pub messages: Vec<String>,
    pub environment: String,
    pub error: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl IncidentRow {
    /// Build the initial row for a newly received ticket.
    pub fn new(incident: NewIncident) -> Self {
        let now = Utc::now();
        IncidentRow {
            id: None,
            ticket_id: incident.ticket_id.to_string(),
            priority: incident.priority.as_str().to_string(),
            status: "received".to_string(),
            classification: None,
            execution_result: None,
            validation_report: None,
            messages: Vec::new(),
            environment: incident.environment,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Summary projection of an incident row (list queries select only these
/// columns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSummaryRow {
    pub ticket_id: String,
    pub priority: String,
    pub status: String,
    pub environment: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Audit log row stored in SurrealDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub ticket_id: String,
    pub action: String,
    pub agent: String,
    pub details: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl AuditRow {
    pub fn from_entry(entry: AuditEntry) -> Self {
        AuditRow {
            id: None,
            ticket_id: entry.ticket_id.to_string(),
            action: entry.action,
            agent: entry.agent,
            details: entry.details,
            timestamp: entry.timestamp,
        }
    }

    pub fn into_entry(self) -> AuditEntry {
        AuditEntry {
            ticket_id: TicketId(self.ticket_id),
            action: self.action,
            agent: self.agent,
            details: self.details,
            timestamp: self.timestamp,
        }
    }
}
