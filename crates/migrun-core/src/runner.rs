use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use migrun_common::Result;
use migrun_state::StateStore;
use tracing::{info, warn};

use crate::config::{PersistMode, RunnerConfig};
use crate::discovery::MigrationDiscovery;
use crate::registry::MigrationRegistry;

/// Outcome of a successful [`Runner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// IDs applied during this run, in execution order.
    pub applied: Vec<String>,
    /// Number of migrations already recorded as run before this run started.
    pub already_applied: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Applied,
    Pending,
    /// Recorded as run, but no script for it was discovered.
    Missing,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Missing => "missing",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: String,
    pub status: MigrationStatus,
}

/// Applies pending migrations one at a time, in discovery order.
pub struct Runner {
    store: StateStore,
    discovery: MigrationDiscovery,
    registry: MigrationRegistry,
    persist: PersistMode,
}

impl Runner {
    pub fn new(
        store: StateStore,
        discovery: MigrationDiscovery,
        registry: MigrationRegistry,
    ) -> Self {
        Self {
            store,
            discovery,
            registry,
            persist: PersistMode::default(),
        }
    }

    pub fn from_config(config: &RunnerConfig, registry: MigrationRegistry) -> Self {
        Self::new(
            StateStore::new(&config.state_file),
            MigrationDiscovery::new(&config.migrations_dir),
            registry,
        )
        .with_persist(config.persist)
    }

    pub fn with_persist(mut self, persist: PersistMode) -> Self {
        self.persist = persist;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Initialize state, apply every pending migration, then save.
    ///
    /// Any error aborts the run. With [`PersistMode::AtEnd`] nothing from the
    /// failed batch is written; with [`PersistMode::Checkpoint`] migrations
    /// that completed before the failure stay recorded.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = self.store.initialize()?;
        let already_applied = state.applied_ids().len();

        let pending = self.discovery.pending(&state.migrations)?;
        if pending.is_empty() {
            info!("no pending migrations ({already_applied} already applied)");
        } else {
            info!("{} pending migration(s)", pending.len());
        }

        let mut applied = Vec::with_capacity(pending.len());
        for id in pending {
            let migration = self.registry.load(&id)?;

            info!("applying migration {id}");
            let started = Instant::now();
            migration.run().await?;
            state.mark_completed(&id);
            info!("applied migration {id} in {:.2?}", started.elapsed());

            if self.persist == PersistMode::Checkpoint {
                self.store.save(&state)?;
            }
            applied.push(id);
        }

        self.store.save(&state)?;
        Ok(RunSummary {
            applied,
            already_applied,
        })
    }

    /// Run the `rollback` operation of a single migration.
    ///
    /// The state file is left untouched: records are never removed.
    pub async fn rollback(&self, id: &str) -> Result<()> {
        let migration = self.registry.load(id)?;
        info!("rolling back migration {id}");
        migration.rollback().await?;
        if self.store.peek()?.is_applied(id) {
            warn!(
                "migration {id} is still recorded as applied in {}",
                self.store.path().display()
            );
        }
        Ok(())
    }

    /// Read-only view of discovered and recorded migrations.
    ///
    /// Discovered scripts come first, in directory-listing order, followed by
    /// recorded IDs that no longer have a script.
    pub fn status(&self) -> Result<Vec<StatusEntry>> {
        let state = self.store.peek()?;
        let candidates = self.discovery.scan()?;

        let discovered: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let mut entries: Vec<StatusEntry> = candidates
            .iter()
            .map(|c| StatusEntry {
                id: c.id.clone(),
                status: if state.is_applied(&c.id) {
                    MigrationStatus::Applied
                } else {
                    MigrationStatus::Pending
                },
            })
            .collect();

        entries.extend(
            state
                .migrations
                .iter()
                .filter(|m| m.is_already_run && !discovered.contains(m.id.as_str()))
                .map(|m| StatusEntry {
                    id: m.id.clone(),
                    status: MigrationStatus::Missing,
                }),
        );
        Ok(entries)
    }
}
