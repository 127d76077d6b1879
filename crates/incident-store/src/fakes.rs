//! In-memory fakes for the storage trait (testing only)
//!
//! Provides `MemoryIncidentStore`, a full in-memory implementation of
//! [`IncidentStore`], and `FlakyIncidentStore`, a wrapper with failure
//! injection switches so callers can exercise the guarded and best-effort
//! write paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{StoreError, StoreResult};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryIncidentStore
// ---------------------------------------------------------------------------

/// In-memory incident store backed by `HashMap`s.
#[derive(Debug, Default)]
pub struct MemoryIncidentStore {
    incidents: Mutex<HashMap<String, Incident>>,
    // (insertion seq, entry); seq breaks timestamp ties deterministically
    audit: Mutex<HashMap<String, Vec<(u64, AuditEntry)>>>,
    audit_seq: Mutex<u64>,
}

impl MemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn create_incident(&self, incident: NewIncident) -> StoreResult<()> {
        let mut incidents = self.incidents.lock().unwrap();
        if incidents.contains_key(incident.ticket_id.as_str()) {
            return Err(StoreError::DuplicateTicket {
                ticket_id: incident.ticket_id.to_string(),
            });
        }
        let now = Utc::now();
        incidents.insert(
            incident.ticket_id.to_string(),
            Incident {
                ticket_id: incident.ticket_id,
                priority: incident.priority,
                status: IncidentStatus::Received,
                classification: None,
                execution_result: None,
                validation_report: None,
                messages: Vec::new(),
                environment: incident.environment,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn update_incident(
        &self,
        ticket_id: &TicketId,
        patch: IncidentPatch,
    ) -> StoreResult<()> {
        let mut incidents = self.incidents.lock().unwrap();
        let incident =
            incidents
                .get_mut(ticket_id.as_str())
                .ok_or_else(|| StoreError::TicketNotFound {
                    ticket_id: ticket_id.to_string(),
                })?;

        if let Some(status) = patch.status {
            incident.status = status;
        }
        if let Some(classification) = patch.classification {
            incident.classification = Some(classification);
        }
        if let Some(execution_result) = patch.execution_result {
            incident.execution_result = Some(execution_result);
        }
        if let Some(validation_report) = patch.validation_report {
            incident.validation_report = Some(validation_report);
        }
        if let Some(messages) = patch.messages {
            incident.messages = messages;
        }
        if let Some(error) = patch.error {
            incident.error = Some(error);
        }
        // Keep updated_at monotonic even if the wall clock steps backwards.
        incident.updated_at = incident.updated_at.max(Utc::now());
        Ok(())
    }

    async fn get_incident(&self, ticket_id: &TicketId) -> StoreResult<Option<Incident>> {
        let incidents = self.incidents.lock().unwrap();
        Ok(incidents.get(ticket_id.as_str()).cloned())
    }

    async fn list_incidents(
        &self,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<IncidentSummary>> {
        let incidents = self.incidents.lock().unwrap();
        let mut all: Vec<&Incident> = incidents.values().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.ticket_id.as_str().cmp(a.ticket_id.as_str()))
        });
        Ok(all
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|i| IncidentSummary {
                ticket_id: i.ticket_id.clone(),
                priority: i.priority,
                status: i.status,
                environment: i.environment.clone(),
                created_at: i.created_at,
                updated_at: i.updated_at,
            })
            .collect())
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        let seq = {
            let mut audit_seq = self.audit_seq.lock().unwrap();
            *audit_seq += 1;
            *audit_seq
        };
        let mut audit = self.audit.lock().unwrap();
        audit
            .entry(entry.ticket_id.to_string())
            .or_default()
            .push((seq, entry));
        Ok(())
    }

    async fn audit_trail(&self, ticket_id: &TicketId) -> StoreResult<Vec<AuditEntry>> {
        let audit = self.audit.lock().unwrap();
        let mut entries = audit
            .get(ticket_id.as_str())
            .cloned()
            .unwrap_or_default();
        entries.sort_by(|(sa, a), (sb, b)| b.timestamp.cmp(&a.timestamp).then(sb.cmp(sa)));
        Ok(entries.into_iter().map(|(_, e)| e).collect())
    }
}

// ---------------------------------------------------------------------------
// FlakyIncidentStore
// ---------------------------------------------------------------------------

/// Wrapper around [`MemoryIncidentStore`] with per-operation failure
/// injection. Used to test that guarded writes propagate `Unavailable` and
/// that best-effort audit writes are swallowed without masking the primary
/// error.
#[derive(Debug, Default)]
pub struct FlakyIncidentStore {
    inner: MemoryIncidentStore,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    fail_audit_appends: AtomicBool,
}

impl FlakyIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    fn injected(op: &str) -> StoreError {
        StoreError::Unavailable(format!("injected {op} failure"))
    }
}

#[async_trait]
impl IncidentStore for FlakyIncidentStore {
    async fn create_incident(&self, incident: NewIncident) -> StoreResult<()> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::injected("create_incident"));
        }
        self.inner.create_incident(incident).await
    }

    async fn update_incident(
        &self,
        ticket_id: &TicketId,
        patch: IncidentPatch,
    ) -> StoreResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::injected("update_incident"));
        }
        self.inner.update_incident(ticket_id, patch).await
    }

    async fn get_incident(&self, ticket_id: &TicketId) -> StoreResult<Option<Incident>> {
        self.inner.get_incident(ticket_id).await
    }

    async fn list_incidents(
        &self,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<IncidentSummary>> {
        self.inner.list_incidents(limit, offset).await
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        if self.fail_audit_appends.load(Ordering::SeqCst) {
            return Err(Self::injected("append_audit"));
        }
        self.inner.append_audit(entry).await
    }

    async fn audit_trail(&self, ticket_id: &TicketId) -> StoreResult<Vec<AuditEntry>> {
        self.inner.audit_trail(ticket_id).await
    }
}
