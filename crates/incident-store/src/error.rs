//! Error types for incident-store

use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the incident persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// A ticket with this identifier already has an incident row
    #[error("incident already exists for ticket: {ticket_id}")]
    DuplicateTicket { ticket_id: String },

    /// An update targeted a ticket with no incident row
    #[error("incident not found for ticket: {ticket_id}")]
    TicketNotFound { ticket_id: String },

    /// The backing storage could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed a query
    #[error("store backend error: {0}")]
    Backend(String),

    /// A persisted payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
