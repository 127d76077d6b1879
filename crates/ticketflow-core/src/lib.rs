//! Ticketflow Core Library
//!
//! The pipeline execution engine: stage sequencing, the per-stage state
//! contract, guarded persistence through the audit recorder, and the
//! centralized error-handling path. Collaborators (classifier, executor,
//! validator, updater) plug in behind narrow traits; defaults are provided
//! so the crate runs end-to-end out of the box.

pub mod classifier;
pub mod domain;
pub mod executor;
pub mod obs;
pub mod pipeline;
pub mod receiver;
pub mod recording;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod updater;
pub mod validator;

pub use classifier::{Classifier, ClassifyError, RuleClassifier};
pub use domain::{
    ActionKind, ClassificationResult, ClassificationSource, CompletionStatus, ExecutionResult,
    MiddlewareType, PipelineError, RiskLevel, Stage, Ticket, TicketDigest, TicketError,
    UpdateResponse, ValidationReport, ValidationStatus,
};
pub use executor::{ExecuteError, Executor, PlaybookExecutor};
pub use pipeline::TicketPipeline;
pub use receiver::TicketReceiver;
pub use recording::AuditRecorder;
pub use service::{
    IncidentHistory, ServiceConfig, StatusView, SubmitReceipt, TicketService,
};
pub use state::PipelineState;
pub use telemetry::init_tracing;
pub use updater::{ServiceDeskUpdater, UpdateError, Updater};
pub use validator::{ChecklistValidator, ValidateError, Validator};

pub use incident_store::{
    AuditEntry, Incident, IncidentPatch, IncidentStatus, IncidentStore, IncidentSummary,
    NewIncident, Priority, StoreError, StoreResult, SurrealIncidentStore, TicketId,
};
