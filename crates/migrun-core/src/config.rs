use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};

pub const DEFAULT_STATE_FILE: &str = "data.json";
pub const DEFAULT_MIGRATIONS_DIR: &str = ".build/migrations";

/// When the runner writes the state file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Once, after every pending migration has succeeded. A failure part way
    /// through a batch discards the whole batch's records.
    #[default]
    AtEnd,
    /// After each successful migration, and once more at the end.
    Checkpoint,
}

/// Locations and behavior for a single runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub working_dir: PathBuf,
    pub state_file: PathBuf,
    pub migrations_dir: PathBuf,
    pub persist: PersistMode,
}

impl RunnerConfig {
    /// Defaults rooted at `working_dir`: `data.json` and `.build/migrations`.
    pub fn for_working_dir(working_dir: impl AsRef<Path>) -> Result<Self> {
        let working_dir = std::path::absolute(working_dir.as_ref()).map_err(|e| {
            Error::Config(format!(
                "invalid working directory {}: {e}",
                working_dir.as_ref().display()
            ))
        })?;

        Ok(Self {
            state_file: working_dir.join(DEFAULT_STATE_FILE),
            migrations_dir: working_dir.join(DEFAULT_MIGRATIONS_DIR),
            working_dir,
            persist: PersistMode::default(),
        })
    }

    pub fn from_current_dir() -> Result<Self> {
        Self::for_working_dir(std::env::current_dir()?)
    }

    /// Override the state file. Relative paths resolve against the working
    /// directory.
    pub fn with_state_file(mut self, path: impl AsRef<Path>) -> Self {
        self.state_file = self.working_dir.join(path);
        self
    }

    /// Override the migrations directory. Relative paths resolve against the
    /// working directory.
    pub fn with_migrations_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.migrations_dir = self.working_dir.join(path);
        self
    }

    pub fn with_persist(mut self, persist: PersistMode) -> Self {
        self.persist = persist;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rooted_at_working_dir() {
        let config = RunnerConfig::for_working_dir("/srv/app").unwrap();
        assert_eq!(config.working_dir, PathBuf::from("/srv/app"));
        assert_eq!(config.state_file, PathBuf::from("/srv/app/data.json"));
        assert_eq!(
            config.migrations_dir,
            PathBuf::from("/srv/app/.build/migrations")
        );
        assert_eq!(config.persist, PersistMode::AtEnd);
    }

    #[test]
    fn overrides_resolve_relative_to_working_dir() {
        let config = RunnerConfig::for_working_dir("/srv/app")
            .unwrap()
            .with_state_file("state/applied.json")
            .with_migrations_dir("/opt/migrations")
            .with_persist(PersistMode::Checkpoint);

        assert_eq!(config.state_file, PathBuf::from("/srv/app/state/applied.json"));
        assert_eq!(config.migrations_dir, PathBuf::from("/opt/migrations"));
        assert_eq!(config.persist, PersistMode::Checkpoint);
    }

    #[test]
    fn from_current_dir_uses_process_working_dir() {
        let config = RunnerConfig::from_current_dir().unwrap();
        assert_eq!(config.working_dir, std::env::current_dir().unwrap());
        assert_eq!(config.state_file, config.working_dir.join(DEFAULT_STATE_FILE));
    }

    #[test]
    fn relative_working_dir_becomes_absolute() {
        let config = RunnerConfig::for_working_dir("project").unwrap();
        assert!(config.working_dir.is_absolute());
        assert!(config.working_dir.ends_with("project"));
    }
}
