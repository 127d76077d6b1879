//! Canonical ticket digest for audit reproducibility.
//!
//! Two submissions with identical content produce the same digest, so audit
//! trails can prove a ticket was classified from the same input even across
//! re-ingestion into a fresh store.

use sha2::{Digest, Sha256};

use crate::domain::ticket::Ticket;

/// SHA-256 hex digest over the canonical (key-sorted) JSON form of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TicketDigest(String);

impl TicketDigest {
    /// Compute the digest of a ticket's canonical JSON form.
    pub fn of(ticket: &Ticket) -> Self {
        let value = serde_json::to_value(ticket).unwrap_or(serde_json::Value::Null);
        let canonical = sort_keys(&value);
        // Canonical form always serializes: inputs are plain strings/enums.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        TicketDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for TicketDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recursively sort JSON object keys so serialization order cannot change
/// the digest.
fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: std::collections::BTreeMap<_, _> =
                map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(serde_json::Value::Null)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::tests::raw_ticket;

    #[test]
    fn same_content_same_digest() {
        let a = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let b = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        assert_eq!(TicketDigest::of(&a), TicketDigest::of(&b));
    }

    #[test]
    fn different_content_different_digest() {
        let a = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let b = Ticket::from_value(&raw_ticket("INC0012346")).unwrap();
        assert_ne!(TicketDigest::of(&a), TicketDigest::of(&b));
    }

    #[test]
    fn digest_is_sha256_hex() {
        let ticket = Ticket::from_value(&raw_ticket("INC0012345")).unwrap();
        let digest = TicketDigest::of(&ticket);
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest.short().len(), 12);
    }
}
