use ledgerline_application::CreateBookInput;
use ledgerline_core::AppResult;
use tracing::info;

use crate::state::AppState;

const DEV_SEED_BOOKS: [(&str, &str, &str, &str); 3] = [
    (
        "book-1",
        "The Pragmatic Programmer",
        "Andrew Hunt, David Thomas",
        "Addison-Wesley",
    ),
    ("book-2", "Clean Code", "Robert C. Martin", "Prentice Hall"),
    ("book-3", "Design Patterns", "Gang of Four", "Addison-Wesley"),
];

/// Seeds demo books when they are absent.
///
/// Demo users come from the dev seed API keys. This runs outside any
/// request, so the audit trail skips these writes.
pub async fn run(state: &AppState) -> AppResult<()> {
    for (book_id, title, authors, published_by) in DEV_SEED_BOOKS {
        if state.book_service.find_by_id(book_id).await.is_ok() {
            continue;
        }

        let input = CreateBookInput {
            title: title.to_owned(),
            authors: authors.to_owned(),
            published_by: published_by.to_owned(),
        };
        state.book_service.create_with_id(book_id, input).await?;
        info!(book_id, title, "dev seed book created");
    }

    Ok(())
}
