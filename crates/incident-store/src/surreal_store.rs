//! SurrealDB-backed IncidentStore implementation
//!
//! Uses `schema::IncidentRow` and `schema::AuditRow` for persistence,
//! converting to/from `storage_traits` types at the boundary.

use async_trait::async_trait;
use chrono::Utc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::schema::{AuditRow, IncidentRow, IncidentSummaryRow};
use crate::storage_traits::{
    AuditEntry, Incident, IncidentPatch, IncidentStatus, IncidentStore, IncidentSummary,
    NewIncident, Priority, TicketId,
};

/// SurrealDB-backed implementation of [`IncidentStore`].
pub struct SurrealIncidentStore {
    db: Surreal<Any>,
}

impl SurrealIncidentStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `ticketflow/main`, and runs `init_schema`.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::open("mem://").await
    }

    /// Connect to the given SurrealDB endpoint and initialize the schema.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect to {url}: {e}")))?;

        db.use_ns("ticketflow")
            .use_db("main")
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealIncidentStore connected ({})", url);
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Uses `TICKETFLOW_DB_URL` when set; otherwise falls back to local
    /// persistence in `.ticketflow/db`.
    pub async fn from_env() -> StoreResult<Self> {
        if let Ok(url) = std::env::var("TICKETFLOW_DB_URL") {
            return Self::open(&url).await;
        }

        let path = ".ticketflow/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StoreError::Unavailable(format!(
                "failed to create database directory {path}: {e}"
            ))
        })?;
        let url = format!("surrealkv://{path}");
        info!(
            "TICKETFLOW_DB_URL not set, using local persistence: {}",
            url
        );
        Self::open(&url).await
    }

    // -- private helpers -----------------------------------------------------

    /// Fetch an incident row by ticket id, or `None` when absent.
    async fn fetch_row(&self, ticket_id: &str) -> StoreResult<Option<IncidentRow>> {
        let tid_owned = ticket_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM incidents WHERE ticket_id = $tid")
            .bind(("tid", tid_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<IncidentRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Convert an `IncidentRow` (DB row) into a `storage_traits::Incident`.
    fn row_to_incident(row: IncidentRow) -> StoreResult<Incident> {
        Ok(Incident {
            ticket_id: TicketId(row.ticket_id),
            priority: Priority::parse(&row.priority)?,
            status: IncidentStatus::parse(&row.status)?,
            classification: row.classification,
            execution_result: row.execution_result,
            validation_report: row.validation_report,
            messages: row.messages,
            environment: row.environment,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn summary_row_to_summary(row: IncidentSummaryRow) -> StoreResult<IncidentSummary> {
        Ok(IncidentSummary {
            ticket_id: TicketId(row.ticket_id),
            priority: Priority::parse(&row.priority)?,
            status: IncidentStatus::parse(&row.status)?,
            environment: row.environment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl IncidentStore for SurrealIncidentStore {
    async fn create_incident(&self, incident: NewIncident) -> StoreResult<()> {
        let ticket_id = incident.ticket_id.to_string();

        // Fast-path rejection; the UNIQUE index on ticket_id remains the
        // authoritative guard under concurrent creates.
        if self.fetch_row(&ticket_id).await?.is_some() {
            return Err(StoreError::DuplicateTicket { ticket_id });
        }

        let row = IncidentRow::new(incident);
        debug!(ticket_id = %ticket_id, "creating incident");

        let created: Result<Option<IncidentRow>, surrealdb::Error> =
            self.db.create("incidents").content(row).await;

        match created {
            Ok(_) => Ok(()),
            // A concurrent create that won the race trips the unique index.
            Err(e) if e.to_string().contains("idx_ticket_id") => {
                Err(StoreError::DuplicateTicket { ticket_id })
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn update_incident(
        &self,
        ticket_id: &TicketId,
        patch: IncidentPatch,
    ) -> StoreResult<()> {
        let mut row = self
            .fetch_row(ticket_id.as_str())
            .await?
            .ok_or_else(|| StoreError::TicketNotFound {
                ticket_id: ticket_id.to_string(),
            })?;

        if let Some(status) = patch.status {
            row.status = status.as_str().to_string();
        }
        if let Some(classification) = patch.classification {
            row.classification = Some(classification);
        }
        if let Some(execution_result) = patch.execution_result {
            row.execution_result = Some(execution_result);
        }
        if let Some(validation_report) = patch.validation_report {
            row.validation_report = Some(validation_report);
        }
        if let Some(messages) = patch.messages {
            row.messages = messages;
        }
        if let Some(error) = patch.error {
            row.error = Some(error);
        }
        // Keep updated_at monotonic even if the wall clock steps backwards.
        row.updated_at = row.updated_at.max(Utc::now());

        let tid_owned = ticket_id.to_string();
        self.db
            .query("UPDATE incidents CONTENT $row WHERE ticket_id = $tid")
            .bind(("row", row))
            .bind(("tid", tid_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_incident(&self, ticket_id: &TicketId) -> StoreResult<Option<Incident>> {
        match self.fetch_row(ticket_id.as_str()).await? {
            Some(row) => Ok(Some(Self::row_to_incident(row)?)),
            None => Ok(None),
        }
    }

    async fn list_incidents(
        &self,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<IncidentSummary>> {
        let mut res = self
            .db
            .query(
                "SELECT ticket_id, priority, status, environment, created_at, updated_at \
                 FROM incidents ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("limit", limit as i64))
            .bind(("offset", offset as i64))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<IncidentSummaryRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(Self::summary_row_to_summary).collect()
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        let row = AuditRow::from_entry(entry);

        let _created: Option<AuditRow> = self
            .db
            .create("audit_log")
            .content(row)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn audit_trail(&self, ticket_id: &TicketId) -> StoreResult<Vec<AuditEntry>> {
        let tid_owned = ticket_id.to_string();
        let mut res = self
            .db
            .query(
                "SELECT * FROM audit_log WHERE ticket_id = $tid ORDER BY timestamp DESC",
            )
            .bind(("tid", tid_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<AuditRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(rows.into_iter().map(AuditRow::into_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_traits::Priority;

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let store = SurrealIncidentStore::in_memory().await.unwrap();

        // Re-running the DEFINE statements against the live schema must not
        // fail, and the store stays usable afterwards.
        migrations::init_schema(&store.db).await.unwrap();

        store
            .create_incident(NewIncident {
                ticket_id: TicketId::from("INC-1"),
                priority: Priority::Low,
                environment: "dev".to_string(),
            })
            .await
            .unwrap();
    }
}
