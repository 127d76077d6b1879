//! Domain models for Ticketflow.
//!
//! Canonical definitions for the core entities:
//! - `Ticket`: validated unit of work submitted to the pipeline
//! - `Stage`: one of the ordered processing steps
//! - Stage results: classification, execution, validation, update payloads
//! - `TicketDigest`: canonical content digest for audit reproducibility

pub mod digest;
pub mod error;
pub mod results;
pub mod stage;
pub mod ticket;

pub use digest::TicketDigest;
pub use error::PipelineError;
pub use results::{
    ActionKind, ClassificationResult, ClassificationSource, CompletionStatus, ExecutionResult,
    MiddlewareType, RiskLevel, UpdateResponse, ValidationReport, ValidationStatus,
};
pub use stage::Stage;
pub use ticket::{Ticket, TicketError};
