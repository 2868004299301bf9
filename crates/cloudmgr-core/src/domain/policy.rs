//! Provider-kind policy table for implicit project linkage
//!
//! Some clouds expect every registration to map onto a project of the same
//! name in the identity service. Which kinds need that is data, not code.

use std::collections::HashSet;

use super::provider::ProviderKind;

/// Set of provider kinds that get an implicit per-registration project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLinkagePolicy {
    kinds: HashSet<ProviderKind>,
}

impl ProjectLinkagePolicy {
    pub fn new<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = ProviderKind>,
    {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// A policy that never links projects
    pub fn none() -> Self {
        Self {
            kinds: HashSet::new(),
        }
    }

    pub fn requires_linkage(&self, kind: ProviderKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Default for ProjectLinkagePolicy {
    fn default() -> Self {
        Self::new([ProviderKind::Azure])
    }
}
