use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use ledgerline_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::json;

/// Position in a `(timestamp desc, id desc)` ordering.
///
/// Callers only ever see the encoded token and hand it back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor {
    timestamp: DateTime<Utc>,
    id: String,
}

#[derive(Deserialize)]
struct CursorPayload {
    timestamp: String,
    id: String,
}

impl PageCursor {
    /// Creates a cursor pointing at the given row.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            timestamp,
            id: id.into(),
        }
    }

    /// Returns the timestamp of the last row seen.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the identifier of the last row seen.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns whether a row sorts strictly after this cursor.
    #[must_use]
    pub fn precedes(&self, timestamp: DateTime<Utc>, id: &str) -> bool {
        timestamp < self.timestamp || (timestamp == self.timestamp && id < self.id.as_str())
    }

    /// Serializes the cursor into an opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "id": self.id,
        });
        STANDARD.encode(payload.to_string())
    }

    /// Parses a token produced by [`PageCursor::encode`].
    pub fn decode(token: &str) -> AppResult<Self> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|error| AppError::InvalidCursor(format!("token is not base64: {error}")))?;
        let payload: CursorPayload = serde_json::from_slice(&bytes).map_err(|error| {
            AppError::InvalidCursor(format!("token payload is malformed: {error}"))
        })?;

        let timestamp = DateTime::parse_from_rfc3339(payload.timestamp.as_str())
            .map_err(|error| {
                AppError::InvalidCursor(format!("token timestamp is malformed: {error}"))
            })?
            .with_timezone(&Utc);

        if payload.id.is_empty() {
            return Err(AppError::InvalidCursor("token id must not be empty".to_owned()));
        }

        Ok(Self {
            timestamp,
            id: payload.id,
        })
    }
}
