use std::sync::Arc;

use ledgerline_core::RequestContext;
use ledgerline_domain::{AuditAction, AuditRecord, AuditRecordDraft, DiffOutcome};
use tracing::{error, info, warn};

use crate::AuditRecordRepository;

/// Best-effort writer of audit records.
///
/// Recording never fails its caller: a missing request context or a storage
/// error is logged and the record is dropped. Business state can therefore
/// change without a matching audit record; this gap is accepted.
#[derive(Clone)]
pub struct AuditRecorder {
    repository: Arc<dyn AuditRecordRepository>,
}

impl AuditRecorder {
    /// Creates a recorder writing to the given repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self { repository }
    }

    /// Persists the outcome of one mutation and returns the stored record.
    ///
    /// Actor and request identity are read from the current task's
    /// [`RequestContext`]. The write runs on a detached task, so it completes
    /// even if the caller's future is dropped while waiting for it.
    pub async fn record(
        &self,
        entity: &str,
        entity_id: &str,
        action: AuditAction,
        outcome: DiffOutcome,
    ) -> Option<AuditRecord> {
        let Some(context) = RequestContext::current() else {
            warn!(
                entity,
                entity_id,
                action = action.as_str(),
                "no request context available for audit logging"
            );
            return None;
        };

        let diff = match outcome {
            DiffOutcome::Untracked => return None,
            DiffOutcome::NoDiff => None,
            DiffOutcome::Diff(payload) => Some(payload),
        };

        let record = AuditRecord::new(AuditRecordDraft {
            entity: entity.to_owned(),
            entity_id: entity_id.to_owned(),
            action,
            actor_id: context.actor_id().to_owned(),
            request_id: context.request_id().to_owned(),
            diff,
        });

        let repository = Arc::clone(&self.repository);
        let pending = record.clone();
        let persisted = tokio::spawn(async move { repository.append(pending).await }).await;

        match persisted {
            Ok(Ok(())) => {
                info!(
                    audit_id = record.id(),
                    entity,
                    entity_id,
                    action = action.as_str(),
                    actor_id = record.actor_id(),
                    request_id = record.request_id(),
                    "audit record created"
                );
                Some(record)
            }
            Ok(Err(persist_error)) => {
                error!(
                    error = %persist_error,
                    entity,
                    entity_id,
                    action = action.as_str(),
                    request_id = record.request_id(),
                    "failed to create audit record"
                );
                None
            }
            Err(join_error) => {
                error!(
                    error = %join_error,
                    entity,
                    entity_id,
                    action = action.as_str(),
                    "audit persistence task did not complete"
                );
                None
            }
        }
    }
}
