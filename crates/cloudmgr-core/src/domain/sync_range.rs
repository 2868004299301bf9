//! Sync scope request
//!
//! A [`SyncRange`] describes which regions, zones and hosts a sync should
//! cover. References arrive as ids or names and are rewritten in place to
//! canonical ids by the scope normalizer before the range is handed to the
//! task runner.

use serde::{Deserialize, Serialize};

use super::errors::ProviderError;

/// Caller-specified extent of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncRange {
    /// Bypass the eligibility check
    pub force: bool,
    /// Request a full (not incremental) sync
    pub full_sync: bool,
    /// Region references (id or name)
    pub region: Vec<String>,
    /// Zone references (id or name)
    pub zone: Vec<String>,
    /// Host references (id or name)
    pub host: Vec<String>,
}

impl SyncRange {
    /// Creates an empty range (incremental, unforced, no explicit scope)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON payload into a range
    ///
    /// Missing keys default to false / empty.
    ///
    /// # Errors
    /// Returns `ProviderError::InputParameter` for malformed payloads
    pub fn from_json(payload: &serde_json::Value) -> Result<Self, ProviderError> {
        if payload.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(payload.clone())
            .map_err(|e| ProviderError::InputParameter(format!("invalid input {e}")))
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_full_sync(mut self, full_sync: bool) -> Self {
        self.full_sync = full_sync;
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zone = zones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the sync task should collect extended system info
    pub fn needs_sync_info(&self) -> bool {
        self.full_sync || !self.region.is_empty() || !self.zone.is_empty() || !self.host.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_needs_sync_info() {
        assert!(!SyncRange::new().needs_sync_info());
        assert!(!SyncRange::new().with_force(true).needs_sync_info());
        assert!(SyncRange::new().with_full_sync(true).needs_sync_info());
        assert!(SyncRange::new().with_regions(["r1"]).needs_sync_info());
        assert!(SyncRange::new().with_zones(["z1"]).needs_sync_info());
        assert!(SyncRange::new().with_hosts(["h1"]).needs_sync_info());
    }

    #[test]
    fn test_from_json_defaults_missing_keys() {
        let range = SyncRange::from_json(&json!({"force": true, "zone": ["zone-a"]})).unwrap();
        assert!(range.force);
        assert!(!range.full_sync);
        assert!(range.region.is_empty());
        assert_eq!(range.zone, vec!["zone-a".to_string()]);
    }

    #[test]
    fn test_from_json_null_is_empty_range() {
        let range = SyncRange::from_json(&serde_json::Value::Null).unwrap();
        assert_eq!(range, SyncRange::default());
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = SyncRange::from_json(&json!({"region": "not-a-list"})).unwrap_err();
        assert!(matches!(err, ProviderError::InputParameter(_)));
    }

    #[test]
    fn test_serializes_with_wire_keys() {
        let range = SyncRange::new().with_full_sync(true).with_hosts(["h"]);
        let value = serde_json::to_value(&range).unwrap();
        assert_eq!(
            value,
            json!({"force": false, "full_sync": true, "region": [], "zone": [], "host": ["h"]})
        );
    }
}
