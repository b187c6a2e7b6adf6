use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};
use tracing::{debug, info, warn};

use crate::model::StateFile;

/// Result of reading the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedState {
    /// The file held a well-formed state.
    Present(StateFile),
    /// The file was missing, empty, or not valid JSON.
    Absent,
}

impl LoadedState {
    /// The loaded state, or the canonical empty default when absent.
    pub fn into_state(self) -> StateFile {
        match self {
            LoadedState::Present(state) => state,
            LoadedState::Absent => StateFile::default(),
        }
    }
}

/// Reads and writes the JSON state file.
///
/// The file is read once at startup and written once per save. There is no
/// locking: a single process instance is assumed.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file.
    ///
    /// Missing, empty and unparsable files are reported as
    /// [`LoadedState::Absent`]. JSON that parses but does not describe a
    /// valid state is an [`Error::State`].
    pub fn load(&self) -> Result<LoadedState> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no state file at {}", self.path.display());
                return Ok(LoadedState::Absent);
            }
            Err(e) => {
                warn!(
                    "failed to read state file {}, treating as empty: {e}",
                    self.path.display()
                );
                return Ok(LoadedState::Absent);
            }
        };

        if contents.trim().is_empty() {
            return Ok(LoadedState::Absent);
        }

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "state file {} is not valid JSON, treating as empty: {e}",
                    self.path.display()
                );
                return Ok(LoadedState::Absent);
            }
        };

        let state: StateFile = serde_json::from_value(value).map_err(|e| {
            Error::State(format!(
                "malformed state file {}: {e}",
                self.path.display()
            ))
        })?;

        if let Some(id) = state.duplicate_id() {
            return Err(Error::State(format!(
                "state file {} records migration {id} more than once",
                self.path.display()
            )));
        }

        Ok(LoadedState::Present(state))
    }

    /// Load the state, resetting the file to the initialized default unless
    /// it is already initialized with at least one record.
    pub fn initialize(&self) -> Result<StateFile> {
        match self.load()? {
            LoadedState::Present(state) if state.is_established() => {
                debug!(
                    "state file {} holds {} record(s)",
                    self.path.display(),
                    state.migrations.len()
                );
                Ok(state)
            }
            _ => {
                let state = StateFile::initialized();
                self.save(&state)?;
                info!("initialized state file at {}", self.path.display());
                Ok(state)
            }
        }
    }

    /// The state [`initialize`](Self::initialize) would return, without
    /// writing anything.
    pub fn peek(&self) -> Result<StateFile> {
        Ok(match self.load()? {
            LoadedState::Present(state) if state.is_established() => state,
            _ => StateFile::initialized(),
        })
    }

    /// Write `state` as pretty-printed JSON in a single write.
    pub fn save(&self, state: &StateFile) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json).map_err(|e| {
            Error::State(format!(
                "failed to write state file {}: {e}",
                self.path.display()
            ))
        })?;
        debug!("saved state to {}", self.path.display());
        Ok(())
    }
}
