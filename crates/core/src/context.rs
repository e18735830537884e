use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Role attached to an already-authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Full access, including audit history.
    Admin,
    /// Read and edit business entities.
    Reviewer,
}

impl ActorRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Reviewer => "reviewer",
        }
    }

    /// Returns whether this role satisfies the required role.
    #[must_use]
    pub fn permits(&self, required: ActorRole) -> bool {
        match required {
            Self::Reviewer => true,
            Self::Admin => *self == Self::Admin,
        }
    }
}

impl FromStr for ActorRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "reviewer" => Ok(Self::Reviewer),
            _ => Err(AppError::Validation(format!("unknown actor role '{value}'"))),
        }
    }
}

/// Identity of the principal and request that triggered an operation.
///
/// A context is bound to exactly one tokio task through [`RequestContext::scope`]
/// and is never shared between concurrently running requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    request_id: String,
    actor_id: String,
    role: ActorRole,
}

impl RequestContext {
    /// Creates a context for a resolved actor and request.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        actor_id: impl Into<String>,
        role: ActorRole,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            actor_id: actor_id.into(),
            role,
        }
    }

    /// Returns the correlation identifier of the originating request.
    #[must_use]
    pub fn request_id(&self) -> &str {
        self.request_id.as_str()
    }

    /// Returns the acting principal identifier.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        self.actor_id.as_str()
    }

    /// Fails with `Forbidden` unless the actor's role satisfies `required`.
    pub fn require_role(&self, required: ActorRole) -> Result<(), AppError> {
        if self.role.permits(required) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "role '{}' is required",
            required.as_str()
        )))
    }

    /// Runs `future` with this context as the ambient request context.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        REQUEST_CONTEXT.scope(self, future).await
    }

    /// Returns the context of the current task, if one was established.
    #[must_use]
    pub fn current() -> Option<Self> {
        REQUEST_CONTEXT.try_with(Clone::clone).ok()
    }
}
