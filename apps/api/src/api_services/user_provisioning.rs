use ledgerline_application::{ProvisionOutcome, SYSTEM_ACTOR};
use ledgerline_core::{ActorRole, AppResult, RequestContext};
use tracing::info;
use uuid::Uuid;

use crate::auth::ApiKeyTable;
use crate::state::AppState;

/// Creates or rotates one stored user per configured API key.
///
/// Runs as the system actor under a generated `startup-*` request id, so
/// every change is audited with the user's credentials redacted.
pub async fn provision_api_users(state: &AppState, api_keys: &ApiKeyTable) -> AppResult<()> {
    let context = RequestContext::new(
        format!("startup-{}", Uuid::new_v4()),
        SYSTEM_ACTOR,
        ActorRole::Admin,
    );

    context
        .scope(async {
            for (key, principal) in api_keys.principals() {
                let outcome = state
                    .user_directory
                    .provision(principal.actor_id.as_str(), principal.role, key)
                    .await?;
                if outcome != ProvisionOutcome::Unchanged {
                    info!(
                        actor_id = principal.actor_id.as_str(),
                        role = principal.role.as_str(),
                        ?outcome,
                        "api user provisioned"
                    );
                }
            }

            Ok(())
        })
        .await
}
