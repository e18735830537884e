//! Domain model for change-tracked persistence: audit records, policies,
//! diffs and pagination cursors.

#![forbid(unsafe_code)]

mod audit;
mod cursor;
mod diff;
mod policy;

pub use audit::{AuditAction, AuditRecord, AuditRecordDraft, DiffPayload, FieldChange};
pub use cursor::PageCursor;
pub use diff::{DiffEngine, DiffOutcome};
pub use policy::{
    AuditPolicyTable, BOOK_ENTITY, EntityAuditPolicy, REDACTED_VALUE, USER_ENTITY,
};
