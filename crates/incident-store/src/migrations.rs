//! SurrealDB schema initialization for Ticketflow
//!
//! Sets up the `incidents` and `audit_log` tables with the constraints the
//! pipeline relies on: a UNIQUE index on `ticket_id` (the sole concurrency
//! guard against duplicate submissions) and append-only permissions on the
//! audit table.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StoreResult;

/// Initialize all Ticketflow tables in SurrealDB.
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> StoreResult<()> {
    info!("Initializing Ticketflow SurrealDB schema");

    init_incidents_table(db).await?;
    init_audit_log_table(db).await?;

    info!("Ticketflow schema initialization complete");
    Ok(())
}

/// Initialize `incidents` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE incidents {
///   ticket_id:          STRING (unique key)
///   priority:           STRING (enum: low | medium | high)
///   status:             STRING (enum: received | classified | executed | validated | success | failed)
///   classification:     OBJECT?
///   execution_result:   OBJECT?
///   validation_report:  OBJECT?
///   messages:           ARRAY<STRING>
///   environment:        STRING
///   error:              STRING?
///   created_at:         DATETIME (indexed)
///   updated_at:         DATETIME
/// }
/// ```
///
/// Constraints:
/// - `ticket_id` is unique (prevents two runs for the same ticket)
/// - Rows are never deleted by the engine (delete denied)
/// - Status transitions are linear, enforced via app logic
async fn init_incidents_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing incidents table");

    let sql = r#"
        DEFINE TABLE incidents
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        -- Ticket uniqueness: the single concurrency guard for submissions
        DEFINE INDEX idx_ticket_id ON TABLE incidents COLUMNS ticket_id UNIQUE;

        -- Index created_at for list ordering (newest first)
        DEFINE INDEX idx_created_at ON TABLE incidents COLUMNS created_at DESC;

        -- Index status for operational queries (e.g. all failed incidents)
        DEFINE INDEX idx_status ON TABLE incidents COLUMNS status;

        -- Index environment for per-environment filtering
        DEFINE INDEX idx_environment ON TABLE incidents COLUMNS environment;
    "#;

    db.query(sql).await?;
    info!("✓ incidents table initialized");
    Ok(())
}

/// Initialize `audit_log` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE audit_log {
///   ticket_id:  STRING (references incidents.ticket_id, no FK enforcement)
///   action:     STRING (stage name + outcome)
///   agent:      STRING (acting component)
///   details:    OBJECT
///   timestamp:  DATETIME
/// }
/// ```
///
/// Constraints:
/// - Entries are immutable: update and delete are denied at the table level
async fn init_audit_log_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing audit_log table");

    let sql = r#"
        DEFINE TABLE audit_log
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        -- Index ticket_id for trail retrieval
        DEFINE INDEX idx_audit_ticket_id ON TABLE audit_log COLUMNS ticket_id;

        -- Composite index (ticket_id, timestamp) for time-ordered trails
        DEFINE INDEX idx_audit_ticket_id_timestamp ON TABLE audit_log COLUMNS ticket_id, timestamp;

        -- Index action for filtering by event type
        DEFINE INDEX idx_audit_action ON TABLE audit_log COLUMNS action;
    "#;

    db.query(sql).await?;
    info!("✓ audit_log table initialized");
    Ok(())
}
