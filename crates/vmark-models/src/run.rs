//! Run identifiers and run metadata.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one processing run.
///
/// The first 8 hex characters of a UUIDv4 — short enough for filenames,
/// random enough to avoid collisions across overlapping runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    const LEN: usize = 8;

    /// Generate a fresh run id.
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(uuid[..Self::LEN].to_string())
    }

    /// Parse an id from untrusted input (URL path segments). Rejects
    /// anything that is not exactly 8 lowercase hex characters, which also
    /// rules out path traversal.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == Self::LEN && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a completed run, returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,
    /// Number of frames processed.
    pub frames: u64,
    /// Number of detections that passed the filter and were drawn.
    pub detections_drawn: u64,
    /// Wall-clock processing time in milliseconds.
    pub elapsed_ms: u64,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_short_hex() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_two_runs_get_distinct_ids() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(RunId::parse("deadbeef").is_some());
        assert!(RunId::parse("../../sh").is_none());
        assert!(RunId::parse("deadbee").is_none());
        assert!(RunId::parse("deadbeef0").is_none());
        assert!(RunId::parse("DEADBEEF").is_none());
    }

    #[test]
    fn test_serde_transparent() {
        let id = RunId::parse("0123abcd").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0123abcd\"");
    }
}
