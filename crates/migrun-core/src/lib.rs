pub mod config;
pub mod discovery;
pub mod registry;
pub mod runner;
pub mod script;
pub mod traits;

pub use config::{PersistMode, RunnerConfig};
pub use discovery::{Candidate, MigrationDiscovery};
pub use registry::MigrationRegistry;
pub use runner::{MigrationStatus, RunSummary, Runner, StatusEntry};
pub use script::{Interpreter, ScriptMigration};
pub use traits::Migration;
