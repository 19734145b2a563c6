//! Wire models for the consumed HTTP surface
//!
//! Field names follow the server payloads; serde aliases absorb the
//! spelling differences between deployments.

use serde::{Deserialize, Serialize};

use crate::quality::{tier, QualityTier};

/// One upstream decoding instance, as reported by the pool endpoint.
///
/// The client holds a read-only cached copy; the pool service owns the
/// actual state. `locked_in == false` means the server may reassign the
/// instance at any time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolInstance {
    /// Opaque identifier. Display ordinal is the position in the polled
    /// list, not this value.
    #[serde(alias = "ace_id")]
    pub instance_id: String,

    /// Currently loaded content identifier; empty when none.
    #[serde(default)]
    pub content_id: String,

    pub healthy: bool,

    pub locked_in: bool,

    /// Seconds until the lock expires. Meaningful only when `locked_in`.
    #[serde(default)]
    pub time_until_unlock: u64,
}

impl PoolInstance {
    /// Eligible for reassignment by the server.
    pub fn is_available(&self) -> bool {
        !self.locked_in
    }

    /// The loaded content identifier, if any.
    pub fn loaded_content(&self) -> Option<&str> {
        if self.content_id.is_empty() {
            None
        } else {
            Some(&self.content_id)
        }
    }
}

/// Snapshot of the whole pool. Replaced wholesale on every successful
/// poll; never patched incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PoolSnapshot {
    pub instances: Vec<PoolInstance>,
}

impl PoolSnapshot {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoolInstance> {
        self.instances.iter()
    }
}

/// Descriptor for one content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamDescriptor {
    pub content_id: String,
    pub title: String,

    /// Server-computed quality proxy in `[-1, 100]`; `-1` means unknown.
    pub quality: i32,

    #[serde(default)]
    pub program_title: Option<String>,

    #[serde(default)]
    pub program_description: Option<String>,
}

impl StreamDescriptor {
    pub fn quality_tier(&self) -> QualityTier {
        tier(self.quality)
    }
}

/// Payload of the short-lived stream token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub stream_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_instance_deserializes_both_id_spellings() {
        let via_ace: PoolInstance = serde_json::from_str(
            r#"{"ace_id": "a1", "content_id": "", "healthy": true, "locked_in": false}"#,
        )
        .unwrap();
        assert_eq!(via_ace.instance_id, "a1");
        assert_eq!(via_ace.time_until_unlock, 0);
        assert!(via_ace.is_available());
        assert!(via_ace.loaded_content().is_none());

        let via_instance: PoolInstance = serde_json::from_str(
            r#"{"instance_id": "a2", "content_id": "abc", "healthy": true,
                "locked_in": true, "time_until_unlock": 65}"#,
        )
        .unwrap();
        assert_eq!(via_instance.instance_id, "a2");
        assert_eq!(via_instance.time_until_unlock, 65);
        assert!(!via_instance.is_available());
        assert_eq!(via_instance.loaded_content(), Some("abc"));
    }

    #[test]
    fn test_pool_snapshot_is_a_bare_list() {
        let snapshot: PoolSnapshot = serde_json::from_str(
            r#"[{"ace_id": "a1", "content_id": "", "healthy": true, "locked_in": false}]"#,
        )
        .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.instances[0].instance_id, "a1");
    }

    #[test]
    fn test_descriptor_optional_program_fields() {
        let descriptor: StreamDescriptor = serde_json::from_str(
            r#"{"content_id": "abc", "title": "Channel One", "quality": 87}"#,
        )
        .unwrap();
        assert_eq!(descriptor.title, "Channel One");
        assert!(descriptor.program_title.is_none());
        assert_eq!(descriptor.quality_tier(), QualityTier::Good);
    }
}
