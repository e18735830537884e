//! API users and the credentials they authenticate with.
//!
//! Users live in an [`EntityStore`] like any other entity, so provisioning
//! them inside a request context leaves an audit trail with the
//! `credentials` field redacted by policy.

use std::sync::Arc;

use ledgerline_core::{ActorRole, AppError, AppResult};
use serde_json::Value;

use crate::{ENTITY_ID_FIELD, EntityData, EntityFilter, EntityOrder, EntityStore};

const NAME_FIELD: &str = "name";
const ROLE_FIELD: &str = "role";
const CREDENTIALS_FIELD: &str = "credentials";

/// Actor an API credential resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    /// User identifier, recorded as the audit actor.
    pub actor_id: String,
    /// Role stored on the user.
    pub role: ActorRole,
}

/// Result of provisioning one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The user did not exist and was created.
    Created,
    /// The user existed with a different role or credential.
    Updated,
    /// The user already matched.
    Unchanged,
}

/// Application service over the `User` entity store.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn EntityStore>,
}

impl UserDirectory {
    /// Creates a directory over the given user store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolves the user holding `credentials`, if any.
    pub async fn authenticate(&self, credentials: &str) -> AppResult<Option<UserPrincipal>> {
        let mut field_equals = EntityData::new();
        field_equals.insert(CREDENTIALS_FIELD.to_owned(), Value::from(credentials));

        let users = self
            .store
            .find_many(
                EntityFilter {
                    field_equals,
                    beyond: None,
                },
                EntityOrder::NewestFirst,
                1,
            )
            .await?;

        users.first().map(principal_from).transpose()
    }

    /// Ensures a user exists with the given role and credential.
    ///
    /// Existing users keep their other fields; only a changed role or
    /// credential is written back.
    pub async fn provision(
        &self,
        actor_id: &str,
        role: ActorRole,
        credentials: &str,
    ) -> AppResult<ProvisionOutcome> {
        let Some(existing) = self.store.find_by_id(actor_id).await? else {
            let mut user = EntityData::new();
            user.insert(ENTITY_ID_FIELD.to_owned(), Value::from(actor_id));
            user.insert(NAME_FIELD.to_owned(), Value::from(actor_id));
            user.insert(ROLE_FIELD.to_owned(), Value::from(role.as_str()));
            user.insert(CREDENTIALS_FIELD.to_owned(), Value::from(credentials));
            self.store.create(user).await?;
            return Ok(ProvisionOutcome::Created);
        };

        let mut patch = EntityData::new();
        for (field, value) in [(ROLE_FIELD, role.as_str()), (CREDENTIALS_FIELD, credentials)] {
            if existing.get(field).and_then(Value::as_str) != Some(value) {
                patch.insert(field.to_owned(), Value::from(value));
            }
        }
        if patch.is_empty() {
            return Ok(ProvisionOutcome::Unchanged);
        }

        self.store.update(actor_id, patch).await?;
        Ok(ProvisionOutcome::Updated)
    }
}

fn principal_from(user: &EntityData) -> AppResult<UserPrincipal> {
    let actor_id = user
        .get(ENTITY_ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Internal("stored user has no id".to_owned()))?;
    let role = user
        .get(ROLE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Internal(format!("user '{actor_id}' has no role")))?
        .parse::<ActorRole>()
        .map_err(|error| AppError::Internal(format!("user '{actor_id}': {error}")))?;

    Ok(UserPrincipal {
        actor_id: actor_id.to_owned(),
        role,
    })
}
