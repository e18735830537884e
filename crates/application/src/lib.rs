//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod audit_query_service;
mod audit_recorder;
mod book_service;
mod change_tracking_store;
/// Raw entity store port and entity field helpers.
pub mod entity_ports;
/// Cursor pagination shared by the listing paths.
pub mod pagination;
mod user_directory;

#[cfg(test)]
mod test_fakes;

pub use audit_ports::{AuditFilters, AuditRecordQuery, AuditRecordRepository};
pub use audit_query_service::{AuditPage, AuditQueryService};
pub use audit_recorder::AuditRecorder;
pub use book_service::{BookService, CreateBookInput, SYSTEM_ACTOR, UpdateBookInput};
pub use change_tracking_store::ChangeTrackingStore;
pub use entity_ports::{
    CREATED_AT_FIELD, ENTITY_ID_FIELD, EntityData, EntityFilter, EntityOrder, EntityStore,
    UPDATED_AT_FIELD,
};
pub use pagination::{DEFAULT_PAGE_LIMIT, InvalidCursorPolicy, MAX_PAGE_LIMIT, Page};
pub use user_directory::{ProvisionOutcome, UserDirectory, UserPrincipal};
