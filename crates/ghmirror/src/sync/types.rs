//! Options and reports shared by producers and workers.

use std::collections::BTreeMap;

use crate::entity::entity_kind::EntityKind;

use super::error::SyncError;

/// Options for producing and consuming.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Repository names never listed or re-synced.
    pub excluded_repos: Vec<String>,
    /// Whether issue and pull request jobs also sync their comments and
    /// reviews inline.
    pub nested: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            excluded_repos: Vec::new(),
            nested: true,
        }
    }
}

impl SyncOptions {
    pub fn is_excluded(&self, repo: &str) -> bool {
        self.excluded_repos.iter().any(|name| name == repo)
    }
}

/// Result of producing one organization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProduceReport {
    /// Jobs published, per kind.
    pub published: BTreeMap<EntityKind, u64>,
    /// Parents whose listing failed, with the error message.
    pub failed_parents: Vec<(String, String)>,
}

impl ProduceReport {
    pub fn published(&self, kind: EntityKind) -> u64 {
        self.published.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_published(&self) -> u64 {
        self.published.values().sum()
    }

    pub(crate) fn add(&mut self, kind: EntityKind, n: u64) {
        *self.published.entry(kind).or_default() += n;
    }
}

/// Result of a worker run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkReport {
    pub synced: u64,
    pub failed: u64,
}

/// Result of an inline listing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InlineSync {
    pub upserted: u64,
    /// Items whose upsert failed and was skipped.
    pub failed: u64,
}

impl std::ops::AddAssign for InlineSync {
    fn add_assign(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.failed += other.failed;
    }
}

/// An inline listing that may have ended early. `synced` counts what was
/// stored before `error` stopped it.
#[derive(Debug, Default)]
pub struct InlineOutcome {
    pub synced: InlineSync,
    pub error: Option<SyncError>,
}

impl InlineOutcome {
    pub fn into_result(self) -> Result<InlineSync, SyncError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.synced),
        }
    }
}
