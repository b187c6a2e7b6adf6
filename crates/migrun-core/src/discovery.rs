use std::collections::HashSet;
use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};
use migrun_state::MigrationRecord;
use migrun_state::model::applied_ids;
use tracing::{debug, warn};

use crate::script::Interpreter;

/// A migration script found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub path: PathBuf,
}

/// Lists migration scripts in a directory.
pub struct MigrationDiscovery {
    dir: PathBuf,
}

impl MigrationDiscovery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Every recognized script in the directory, in directory-listing order.
    ///
    /// Only regular files with a known script extension are considered. When
    /// two files map to the same ID the first one listed wins.
    pub fn scan(&self) -> Result<Vec<Candidate>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            Error::Discovery(format!(
                "failed to list migrations directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Discovery(format!("failed to read {}: {e}", self.dir.display()))
            })?;
            let file_type = entry.file_type().map_err(|e| {
                Error::Discovery(format!(
                    "failed to stat {}: {e}",
                    entry.path().display()
                ))
            })?;
            if !file_type.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!("skipping non UTF-8 file name in {}", self.dir.display());
                continue;
            };
            if !is_script(name) {
                continue;
            }
            let Some(id) = migration_id(name) else {
                warn!("skipping {name}: no migration id before the first '.'");
                continue;
            };
            if !seen.insert(id.to_string()) {
                warn!("skipping {name}: migration {id} is already provided by another file");
                continue;
            }

            candidates.push(Candidate {
                id: id.to_string(),
                path: entry.path(),
            });
        }

        debug!(
            "found {} migration script(s) in {}",
            candidates.len(),
            self.dir.display()
        );
        Ok(candidates)
    }

    /// IDs of discovered scripts not marked as run in `records`, in
    /// directory-listing order.
    pub fn pending(&self, records: &[MigrationRecord]) -> Result<Vec<String>> {
        let applied = applied_ids(records);
        Ok(self
            .scan()?
            .into_iter()
            .filter(|c| !applied.contains(c.id.as_str()))
            .map(|c| c.id)
            .collect())
    }
}

/// Migration ID for a file name: the text before the first `.`.
pub fn migration_id(file_name: &str) -> Option<&str> {
    file_name.split('.').next().filter(|id| !id.is_empty())
}

fn is_script(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Interpreter::for_extension)
        .is_some()
}
