pub mod model;
pub mod state_store;

pub use model::{MigrationRecord, StateFile};
pub use state_store::{LoadedState, StateStore};
