use std::collections::HashMap;

use ledgerline_core::{ActorRole, AppError, AppResult};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Demo principals installed together with the dev seed data.
pub const DEV_SEED_PRINCIPALS: [(&str, &str, ActorRole); 2] = [
    ("admin-api-key-12345", "admin-user-id", ActorRole::Admin),
    ("reviewer-api-key-67890", "reviewer-user-id", ActorRole::Reviewer),
];

/// Principal an API key is provisioned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPrincipal {
    pub actor_id: String,
    pub role: ActorRole,
}

/// API users configured at startup, parsed from `key:actor:role` entries.
///
/// Each actor holds exactly one key. The table only seeds the user store;
/// requests are authenticated against stored users.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyTable {
    principals: HashMap<String, ApiPrincipal>,
}

impl ApiKeyTable {
    /// Parses a comma separated list of `key:actor:role` entries.
    pub fn parse(value: &str) -> AppResult<Self> {
        let mut table = Self::default();

        for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let mut parts = entry.split(':').map(str::trim);
            let (Some(key), Some(actor_id), Some(role), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(AppError::Validation(
                    "AUTH_API_KEYS entries must look like 'key:actor:role'".to_owned(),
                ));
            };

            if key.is_empty() || actor_id.is_empty() {
                return Err(AppError::Validation(
                    "AUTH_API_KEYS entries need a non-empty key and actor".to_owned(),
                ));
            }

            table.insert(key, actor_id, role.parse::<ActorRole>()?)?;
        }

        Ok(table)
    }

    /// Adds the demo principals whose key and actor are both unconfigured.
    #[must_use]
    pub fn with_dev_seed_keys(mut self) -> Self {
        for (key, actor_id, role) in DEV_SEED_PRINCIPALS {
            if !self.principals.contains_key(key) && !self.has_actor(actor_id) {
                self.principals.insert(
                    key.to_owned(),
                    ApiPrincipal {
                        actor_id: actor_id.to_owned(),
                        role,
                    },
                );
            }
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Iterates over `(key, principal)` pairs.
    pub fn principals(&self) -> impl Iterator<Item = (&str, &ApiPrincipal)> {
        self.principals
            .iter()
            .map(|(key, principal)| (key.as_str(), principal))
    }

    fn has_actor(&self, actor_id: &str) -> bool {
        self.principals
            .values()
            .any(|principal| principal.actor_id == actor_id)
    }

    fn insert(&mut self, key: &str, actor_id: &str, role: ActorRole) -> AppResult<()> {
        if self.has_actor(actor_id) {
            return Err(AppError::Validation(format!(
                "AUTH_API_KEYS lists actor '{actor_id}' more than once"
            )));
        }

        let previous = self.principals.insert(
            key.to_owned(),
            ApiPrincipal {
                actor_id: actor_id.to_owned(),
                role,
            },
        );
        if previous.is_some() {
            return Err(AppError::Validation(
                "AUTH_API_KEYS contains a duplicate key".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ledgerline_core::{ActorRole, AppError};

    use super::{ApiKeyTable, ApiPrincipal};

    fn principal<'a>(table: &'a ApiKeyTable, key: &str) -> Option<&'a ApiPrincipal> {
        table
            .principals()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, principal)| principal)
    }

    #[test]
    fn parses_key_entries() {
        let table = ApiKeyTable::parse(" k1:alice:admin , k2:bob:reviewer ,");

        assert!(table.is_ok_and(|table| {
            principal(&table, "k1").is_some_and(|principal| principal.actor_id == "alice")
                && principal(&table, "k2")
                    .is_some_and(|principal| principal.role == ActorRole::Reviewer)
                && principal(&table, "k3").is_none()
        }));
    }

    #[test]
    fn rejects_malformed_entries() {
        for value in [
            "k1:alice",
            "k1:alice:owner",
            ":alice:admin",
            "k1:a:admin:x",
            "k:a:admin,k:b:admin",
            "k1:a:admin,k2:a:reviewer",
        ] {
            assert!(
                matches!(ApiKeyTable::parse(value), Err(AppError::Validation(_))),
                "{value}"
            );
        }
    }

    #[test]
    fn dev_seed_keys_do_not_override_configured_keys_or_actors() {
        let table = ApiKeyTable::parse(
            "admin-api-key-12345:custom:reviewer,rotated-key:reviewer-user-id:reviewer",
        )
        .unwrap_or_default()
        .with_dev_seed_keys();

        assert!(
            principal(&table, "admin-api-key-12345")
                .is_some_and(|principal| principal.actor_id == "custom")
        );
        assert!(principal(&table, "reviewer-api-key-67890").is_none());
        assert!(principal(&table, "rotated-key").is_some());
        assert!(table.principals().all(|(_, principal)| principal.actor_id != "admin-user-id"));
    }
}
