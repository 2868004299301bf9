//! Catalog entries referenced by sync scopes (regions, zones, hosts)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a catalog reference inside a [`SyncRange`](super::SyncRange)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Region,
    Zone,
    Host,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Region => "region",
            CatalogKind::Zone => "zone",
            CatalogKind::Host => "host",
        }
    }

    /// Capitalized label for user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Region => "Region",
            CatalogKind::Zone => "Zone",
            CatalogKind::Host => "Host",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical identifier
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
