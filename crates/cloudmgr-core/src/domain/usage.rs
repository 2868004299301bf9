//! Usage snapshot of resources owned through a provider registration

use std::fmt;

use serde::{Deserialize, Serialize};

/// Collections whose rows reference an owning provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    /// Compute instances (owned through their host)
    Instance,
    Host,
    /// Virtual networks
    Network,
    Storage,
    StorageCache,
    /// External (elastic) IPs
    ExternalIp,
}

impl DependentKind {
    pub const ALL: [DependentKind; 6] = [
        DependentKind::Instance,
        DependentKind::Host,
        DependentKind::Network,
        DependentKind::Storage,
        DependentKind::StorageCache,
        DependentKind::ExternalIp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependentKind::Instance => "instance",
            DependentKind::Host => "host",
            DependentKind::Network => "network",
            DependentKind::Storage => "storage",
            DependentKind::StorageCache => "storage_cache",
            DependentKind::ExternalIp => "external_ip",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time counts of dependent resources for one registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub instance_count: u64,
    pub host_count: u64,
    pub network_count: u64,
    pub storage_count: u64,
    pub storage_cache_count: u64,
    pub external_ip_count: u64,
}

impl UsageSnapshot {
    /// Returns the count for a single dependent kind
    pub fn count(&self, kind: DependentKind) -> u64 {
        match kind {
            DependentKind::Instance => self.instance_count,
            DependentKind::Host => self.host_count,
            DependentKind::Network => self.network_count,
            DependentKind::Storage => self.storage_count,
            DependentKind::StorageCache => self.storage_cache_count,
            DependentKind::ExternalIp => self.external_ip_count,
        }
    }

    /// Returns true when nothing depends on the registration
    ///
    /// Live instances block deletion like every other dependent kind.
    pub fn is_empty(&self) -> bool {
        DependentKind::ALL.iter().all(|kind| self.count(*kind) == 0)
    }

    /// Returns the kinds with a non-zero count, for error messages
    pub fn blocking_kinds(&self) -> Vec<DependentKind> {
        DependentKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.count(*kind) > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(UsageSnapshot::default().is_empty());
        assert!(UsageSnapshot::default().blocking_kinds().is_empty());
    }

    #[test]
    fn test_any_dependent_makes_non_empty() {
        let usage = UsageSnapshot {
            host_count: 1,
            ..Default::default()
        };
        assert!(!usage.is_empty());
        assert_eq!(usage.blocking_kinds(), vec![DependentKind::Host]);

        let usage = UsageSnapshot {
            external_ip_count: 3,
            ..Default::default()
        };
        assert!(!usage.is_empty());
    }

    #[test]
    fn test_instances_alone_make_non_empty() {
        let usage = UsageSnapshot {
            instance_count: 2,
            ..Default::default()
        };
        assert!(!usage.is_empty());
        assert_eq!(usage.blocking_kinds(), vec![DependentKind::Instance]);
    }

    #[test]
    fn test_count_by_kind() {
        let usage = UsageSnapshot {
            instance_count: 1,
            host_count: 2,
            network_count: 3,
            storage_count: 4,
            storage_cache_count: 5,
            external_ip_count: 6,
        };
        let counts: Vec<u64> = DependentKind::ALL.iter().map(|k| usage.count(*k)).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
    }
}
