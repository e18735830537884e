use ledgerline_application::{AuditQueryService, BookService, UserDirectory};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub book_service: BookService,
    pub audit_query_service: AuditQueryService,
    pub user_directory: UserDirectory,
}
