use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Durable record of which migrations have completed.
///
/// Serialized as `{ "isInitialized": bool, "migrations": [...] }`. Missing
/// fields fall back to their defaults so a hand-written `{}` still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    #[serde(default)]
    pub is_initialized: bool,
    #[serde(default)]
    pub migrations: Vec<MigrationRecord>,
}

/// A single completed migration. Always created with `is_already_run = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub id: String,
    pub is_already_run: bool,
}

impl MigrationRecord {
    pub fn completed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_already_run: true,
        }
    }
}

impl StateFile {
    /// The state written on first run: initialized, nothing applied yet.
    pub fn initialized() -> Self {
        Self {
            is_initialized: true,
            migrations: Vec::new(),
        }
    }

    /// IDs of records marked as already run.
    pub fn applied_ids(&self) -> HashSet<&str> {
        applied_ids(&self.migrations)
    }

    pub fn is_applied(&self, id: &str) -> bool {
        self.migrations
            .iter()
            .any(|m| m.is_already_run && m.id == id)
    }

    /// Record `id` as completed. An existing record for the same ID is
    /// flagged in place rather than duplicated. Returns `false` if `id` was
    /// already marked as run.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        match self.migrations.iter_mut().find(|m| m.id == id) {
            Some(record) if record.is_already_run => false,
            Some(record) => {
                record.is_already_run = true;
                true
            }
            None => {
                self.migrations.push(MigrationRecord::completed(id));
                true
            }
        }
    }

    /// Whether [`StateStore::initialize`](crate::StateStore::initialize)
    /// keeps this state as-is instead of resetting it.
    pub fn is_established(&self) -> bool {
        self.is_initialized && !self.migrations.is_empty()
    }

    /// First record ID that appears more than once, if any.
    pub fn duplicate_id(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.migrations
            .iter()
            .map(|m| m.id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// Set of IDs from `records` whose `is_already_run` flag is set.
pub fn applied_ids(records: &[MigrationRecord]) -> HashSet<&str> {
    records
        .iter()
        .filter(|m| m.is_already_run)
        .map(|m| m.id.as_str())
        .collect()
}
