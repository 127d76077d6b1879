//! Structured observability hooks for pipeline run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via `run_span`
//! - Emission functions for key lifecycle events: run start/finish, stage
//!   transitions, guarded-write failures
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).
//! For JSON output, pass `json = true` to `telemetry::init_tracing`.

use tracing::{error, info, warn};

/// Build the run-scoped tracing span for one pipeline run.
///
/// The engine instruments the run future with this span rather than holding
/// an entered guard, so spawned (Send) runs stay spawnable.
pub fn run_span(run_id: &str, ticket_id: &str) -> tracing::Span {
    tracing::info_span!("ticketflow.run", run_id = %run_id, ticket_id = %ticket_id)
}

/// Emit event: pipeline run started for a ticket.
pub fn emit_run_started(ticket_id: &str, priority: &str, environment: &str) {
    info!(
        event = "run.started",
        ticket_id = %ticket_id,
        priority = %priority,
        environment = %environment,
    );
}

/// Emit event: run finished with terminal status.
pub fn emit_run_finished(ticket_id: &str, status: &str, stages_completed: usize) {
    info!(
        event = "run.finished",
        ticket_id = %ticket_id,
        status = %status,
        stages_completed = stages_completed,
    );
}

/// Emit event: a stage began executing.
pub fn emit_stage_started(ticket_id: &str, stage: &str) {
    info!(event = "stage.started", ticket_id = %ticket_id, stage = %stage);
}

/// Emit event: a stage completed and its result was persisted.
pub fn emit_stage_completed(ticket_id: &str, stage: &str) {
    info!(event = "stage.completed", ticket_id = %ticket_id, stage = %stage);
}

/// Emit event: a stage failed (error level; the run is terminal).
pub fn emit_stage_failed(ticket_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    error!(event = "stage.failed", ticket_id = %ticket_id, stage = %stage, error = %error);
}

/// Emit event: a guarded persistence operation failed.
pub fn emit_persistence_failed(operation: &str, ticket_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "persistence.failed",
        operation = %operation,
        ticket_id = %ticket_id,
        error = %error,
    );
}

/// Emit event: a best-effort bookkeeping write was dropped (warning level).
pub fn emit_best_effort_write_dropped(
    operation: &str,
    ticket_id: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "persistence.best_effort_dropped",
        operation = %operation,
        ticket_id = %ticket_id,
        error = %error,
    );
}
