//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_record_repository;
mod in_memory_entity_store;
mod postgres_audit_record_repository;
mod postgres_entity_store;

pub use in_memory_audit_record_repository::InMemoryAuditRecordRepository;
pub use in_memory_entity_store::InMemoryEntityStore;
pub use postgres_audit_record_repository::PostgresAuditRecordRepository;
pub use postgres_entity_store::PostgresEntityStore;

/// Embedded schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
