use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use migrun_common::{Error, Result};
use tracing::debug;

use crate::discovery::Candidate;
use crate::script::ScriptMigration;
use crate::traits::Migration;

/// Maps migration IDs to the units that implement them.
///
/// Populated once at startup; the run loop only looks entries up.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: HashMap<String, Arc<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every discovered script to a [`ScriptMigration`] executed from
    /// `working_dir`.
    pub fn from_scripts(candidates: &[Candidate], working_dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        for candidate in candidates {
            let migration = ScriptMigration::new(
                candidate.id.clone(),
                candidate.path.clone(),
                working_dir.to_path_buf(),
            )?;
            registry.register(candidate.id.clone(), migration)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> Result<()> {
        let id = id.into();
        if self.migrations.contains_key(&id) {
            return Err(Error::Config(format!("migration {id} is already registered")));
        }
        debug!("registered migration {id}");
        self.migrations.insert(id, Arc::new(migration));
        Ok(())
    }

    /// The migration registered under `id`.
    pub fn load(&self, id: &str) -> Result<Arc<dyn Migration>> {
        self.migrations
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Load(format!("no migration registered for {id}")))
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Registered IDs, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.migrations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Migration for Noop {
        async fn run(&self) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_returns_registered_migration() {
        let mut registry = MigrationRegistry::new();
        registry.register("001_init", Noop).unwrap();

        let migration = registry.load("001_init").unwrap();
        migration.run().await.unwrap();
        assert_eq!(registry.ids(), vec!["001_init"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn load_unknown_id_is_a_load_error() {
        let registry = MigrationRegistry::new();
        let err = registry.load("404_missing").err().unwrap();
        assert!(matches!(err, Error::Load(_)));
        assert!(err.to_string().contains("404_missing"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = MigrationRegistry::new();
        registry.register("001_init", Noop).unwrap();
        assert!(registry.register("001_init", Noop).is_err());
    }

    #[test]
    fn from_scripts_binds_each_candidate() {
        let candidates = vec![
            Candidate {
                id: "002_seed".into(),
                path: "/migrations/002_seed.sh".into(),
            },
            Candidate {
                id: "001_init".into(),
                path: "/migrations/001_init.js".into(),
            },
        ];
        let registry = MigrationRegistry::from_scripts(&candidates, Path::new("/")).unwrap();
        assert_eq!(registry.ids(), vec!["001_init", "002_seed"]);
    }
}
