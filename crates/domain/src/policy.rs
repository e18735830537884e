use std::collections::{BTreeSet, HashMap};

use ledgerline_core::{AppError, AppResult};
use serde::Deserialize;

/// Value written in place of a redacted field.
pub const REDACTED_VALUE: &str = "***";

/// Audit policy for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct EntityAuditPolicy {
    #[serde(rename = "track")]
    tracked: bool,
    #[serde(rename = "exclude", default)]
    excluded_fields: BTreeSet<String>,
    #[serde(rename = "redact", default)]
    redacted_fields: BTreeSet<String>,
}

impl EntityAuditPolicy {
    /// Creates a policy from field name lists.
    #[must_use]
    pub fn new<E, R>(tracked: bool, excluded_fields: E, redacted_fields: R) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            tracked,
            excluded_fields: excluded_fields.into_iter().map(Into::into).collect(),
            redacted_fields: redacted_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a policy that disables auditing.
    #[must_use]
    pub fn untracked() -> Self {
        Self::default()
    }

    /// Returns whether mutations of this entity are audited.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Returns whether the field is dropped from diffs.
    #[must_use]
    pub fn is_excluded(&self, field: &str) -> bool {
        self.excluded_fields.contains(field)
    }

    /// Returns whether the field value is replaced by [`REDACTED_VALUE`].
    #[must_use]
    pub fn is_redacted(&self, field: &str) -> bool {
        self.redacted_fields.contains(field)
    }
}

/// Entity name of catalogue books.
pub const BOOK_ENTITY: &str = "Book";
/// Entity name of API users.
pub const USER_ENTITY: &str = "User";

/// Static mapping from entity name to audit policy, loaded once per process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditPolicyTable {
    policies: HashMap<String, EntityAuditPolicy>,
}

impl AuditPolicyTable {
    /// Creates an empty table in which no entity is tracked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table shipped with the service.
    ///
    /// `Book` drops its `updatedAt` bookkeeping field and `User` never
    /// records raw `credentials`.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with_policy(
                BOOK_ENTITY,
                EntityAuditPolicy::new(true, ["updatedAt"], Vec::<String>::new()),
            )
            .with_policy(
                USER_ENTITY,
                EntityAuditPolicy::new(true, Vec::<String>::new(), ["credentials"]),
            )
    }

    /// Parses a table from its JSON configuration form.
    pub fn from_json(source: &str) -> AppResult<Self> {
        let policies: HashMap<String, EntityAuditPolicy> = serde_json::from_str(source)
            .map_err(|error| AppError::Validation(format!("invalid audit policy table: {error}")))?;

        if let Some(name) = policies.keys().find(|name| name.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "audit policy entity name '{name}' must not be empty"
            )));
        }

        Ok(Self { policies })
    }

    /// Adds or replaces the policy for one entity.
    #[must_use]
    pub fn with_policy(mut self, entity: impl Into<String>, policy: EntityAuditPolicy) -> Self {
        self.policies.insert(entity.into(), policy);
        self
    }

    /// Returns the policy for an entity, if one is configured.
    #[must_use]
    pub fn policy_for(&self, entity: &str) -> Option<&EntityAuditPolicy> {
        self.policies.get(entity)
    }

    /// Returns the policy only when the entity is configured and tracked.
    #[must_use]
    pub fn tracked_policy(&self, entity: &str) -> Option<&EntityAuditPolicy> {
        self.policy_for(entity).filter(|policy| policy.is_tracked())
    }

    /// Returns configured entity names in sorted order.
    #[must_use]
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
