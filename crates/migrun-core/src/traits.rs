use async_trait::async_trait;
use migrun_common::Result;

/// A one-time unit of change.
///
/// `run` applies the change. `rollback` is never called by the runner's
/// apply loop; it exists for the `rollback` command and other tooling.
#[async_trait]
pub trait Migration: Send + Sync {
    async fn run(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}
