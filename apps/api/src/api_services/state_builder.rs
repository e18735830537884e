use std::path::Path;
use std::sync::Arc;

use ledgerline_application::{
    AuditQueryService, AuditRecordRepository, AuditRecorder, BookService, ChangeTrackingStore,
    EntityStore, InvalidCursorPolicy, UserDirectory,
};
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::{AuditPolicyTable, BOOK_ENTITY, DiffEngine, USER_ENTITY};
use ledgerline_infrastructure::{
    InMemoryAuditRecordRepository, InMemoryEntityStore, PostgresAuditRecordRepository,
    PostgresEntityStore,
};
use tracing::info;

use crate::api_config::{ApiConfig, StorageBackendConfig};
use crate::state::AppState;

use super::connect_and_migrate;

pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let policies = load_audit_policies(config.audit_policy_path.as_deref())?;
    info!(entities = ?policies.entity_names(), "audit policy table loaded");

    match &config.storage {
        StorageBackendConfig::Memory => {
            Ok(in_memory_app_state(policies, config.invalid_cursor_policy))
        }
        StorageBackendConfig::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url.as_str()).await?;
            let audit_repository: Arc<dyn AuditRecordRepository> =
                Arc::new(PostgresAuditRecordRepository::new(pool.clone()));
            let tracking = Tracking::new(policies, audit_repository.clone());

            Ok(assemble(
                audit_repository,
                tracking.store(BOOK_ENTITY, PostgresEntityStore::new(pool.clone(), BOOK_ENTITY)),
                tracking.store(USER_ENTITY, PostgresEntityStore::new(pool, USER_ENTITY)),
                config.invalid_cursor_policy,
            ))
        }
    }
}

pub fn in_memory_app_state(
    policies: AuditPolicyTable,
    invalid_cursor_policy: InvalidCursorPolicy,
) -> AppState {
    let audit_repository: Arc<dyn AuditRecordRepository> =
        Arc::new(InMemoryAuditRecordRepository::new());
    let tracking = Tracking::new(policies, audit_repository.clone());

    assemble(
        audit_repository,
        tracking.store(BOOK_ENTITY, InMemoryEntityStore::new(BOOK_ENTITY)),
        tracking.store(USER_ENTITY, InMemoryEntityStore::new(USER_ENTITY)),
        invalid_cursor_policy,
    )
}

fn load_audit_policies(path: Option<&Path>) -> AppResult<AuditPolicyTable> {
    let Some(path) = path else {
        return Ok(AuditPolicyTable::builtin());
    };

    let source = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read AUDIT_POLICY_PATH '{}': {error}",
            path.display()
        ))
    })?;

    AuditPolicyTable::from_json(source.as_str())
}

struct Tracking {
    diff_engine: DiffEngine,
    recorder: AuditRecorder,
}

impl Tracking {
    fn new(policies: AuditPolicyTable, audit_repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self {
            diff_engine: DiffEngine::new(Arc::new(policies)),
            recorder: AuditRecorder::new(audit_repository),
        }
    }

    fn store<S>(&self, entity: &str, raw: S) -> Arc<dyn EntityStore>
    where
        S: EntityStore + 'static,
    {
        Arc::new(ChangeTrackingStore::new(
            entity,
            raw,
            self.diff_engine.clone(),
            self.recorder.clone(),
        ))
    }
}

fn assemble(
    audit_repository: Arc<dyn AuditRecordRepository>,
    book_store: Arc<dyn EntityStore>,
    user_store: Arc<dyn EntityStore>,
    invalid_cursor_policy: InvalidCursorPolicy,
) -> AppState {
    AppState {
        book_service: BookService::new(book_store),
        audit_query_service: AuditQueryService::new(audit_repository)
            .with_invalid_cursor_policy(invalid_cursor_policy),
        user_directory: UserDirectory::new(user_store),
    }
}
