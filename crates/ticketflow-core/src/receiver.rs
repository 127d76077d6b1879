//! Ticket ingestion: raw submission → validated [`Ticket`].

use tracing::debug;

use crate::domain::{Ticket, TicketError};

/// Validates and structures incoming raw tickets.
///
/// Rejection reasons name the specific violated constraint so submitters get
/// an actionable error instead of a generic "invalid ticket".
#[derive(Debug, Default)]
pub struct TicketReceiver;

impl TicketReceiver {
    pub fn new() -> Self {
        Self
    }

    pub fn receive(&self, raw: &serde_json::Value) -> Result<Ticket, TicketError> {
        let ticket = Ticket::from_value(raw)?;
        debug!(ticket_id = %ticket.ticket_id, "ticket received and validated");
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;

    #[test]
    fn receive_accepts_valid_ticket() {
        let receiver = TicketReceiver::new();
        let ticket = receiver.receive(&raw_ticket("INC0012345")).unwrap();
        assert_eq!(ticket.ticket_id.as_str(), "INC0012345");
    }

    #[test]
    fn receive_rejects_malformed_ticket() {
        let receiver = TicketReceiver::new();
        let mut raw = raw_ticket("INC0012345");
        raw.as_object_mut().unwrap().remove("requested_by");

        let err = receiver.receive(&raw).unwrap_err();
        assert_eq!(err, TicketError::MissingField("requested_by"));
    }
}
