use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("state error: {0}")]
    State(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("migration {id} failed: {reason}")]
    Migration { id: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn migration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Migration {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
