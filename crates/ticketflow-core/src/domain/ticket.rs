//! Ticket model and raw-submission validation.

use incident_store::{Priority, TicketId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while structuring a raw submission into a [`Ticket`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A validated work ticket.
///
/// Built from raw JSON by [`Ticket::from_value`]; every field is required and
/// non-empty, so downstream stages never re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    /// Configuration item the work targets (hostname).
    pub ci_name: String,
    pub environment: String,
    pub requested_by: String,
}

impl Ticket {
    /// Validate and structure a raw submission.
    ///
    /// Each violated constraint is reported by field name so callers can
    /// surface a specific rejection reason.
    pub fn from_value(raw: &serde_json::Value) -> Result<Ticket, TicketError> {
        let ticket_id = required_str(raw, "ticket_id")?;
        let priority_raw = required_str(raw, "priority")?;
        let priority =
            Priority::parse(&priority_raw).map_err(|_| TicketError::InvalidField {
                field: "priority",
                reason: format!("expected low/medium/high, got `{priority_raw}`"),
            })?;

        Ok(Ticket {
            ticket_id: TicketId(ticket_id),
            priority,
            category: required_str(raw, "category")?,
            subcategory: required_str(raw, "subcategory")?,
            description: required_str(raw, "description")?,
            ci_name: required_str(raw, "ci_name")?,
            environment: required_str(raw, "environment")?,
            requested_by: required_str(raw, "requested_by")?,
        })
    }
}

fn required_str(raw: &serde_json::Value, field: &'static str) -> Result<String, TicketError> {
    match raw.get(field) {
        None | Some(serde_json::Value::Null) => Err(TicketError::MissingField(field)),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            Err(TicketError::InvalidField {
                field,
                reason: "must not be empty".to_string(),
            })
        }
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(TicketError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A well-formed raw ticket used across the crate's tests.
    pub(crate) fn raw_ticket(ticket_id: &str) -> serde_json::Value {
        json!({
            "ticket_id": ticket_id,
            "priority": "High",
            "category": "Infrastructure",
            "subcategory": "Middleware",
            "description": "Install Apache HTTP Server 2.4.x on production web server",
            "ci_name": "web-server-prod-01",
            "environment": "production",
            "requested_by": "john.doe@company.com",
        })
    }

    #[test]
    fn valid_ticket_is_accepted() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        assert_eq!(ticket.ticket_id.as_str(), "INC0012345");
        assert_eq!(ticket.priority, Priority::High);
        assert_eq!(ticket.ci_name, "web-server-prod-01");
    }

    #[test]
    fn missing_field_is_named() {
        let mut raw = raw_ticket("INC0012345");
        raw.as_object_mut().unwrap().remove("ci_name");

        let err = Ticket::from_value(&raw).unwrap_err();
        assert_eq!(err, TicketError::MissingField("ci_name"));
        assert!(err.to_string().contains("ci_name"));
    }

    #[test]
    fn empty_field_is_rejected() {
        let mut raw = raw_ticket("INC0012345");
        raw["description"] = json!("   ");

        let err = Ticket::from_value(&raw).unwrap_err();
        assert!(matches!(
            err,
            TicketError::InvalidField {
                field: "description",
                ..
            }
        ));
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let mut raw = raw_ticket("INC0012345");
        raw["priority"] = json!("urgent");

        let err = Ticket::from_value(&raw).unwrap_err();
        assert!(matches!(
            err,
            TicketError::InvalidField {
                field: "priority",
                ..
            }
        ));
    }

    #[test]
    fn non_string_field_is_rejected() {
        let mut raw = raw_ticket("INC0012345");
        raw["ticket_id"] = json!(42);

        let err = Ticket::from_value(&raw).unwrap_err();
        assert!(matches!(
            err,
            TicketError::InvalidField {
                field: "ticket_id",
                ..
            }
        ));
    }
}
