use crate::config::ConfigError;
use crate::db::StoreError;
use crate::generator::GeneratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Keyspace or table creation failed; the application cannot start.
    #[error("Provisioning failed: {0}")]
    Provisioning(StoreError),
    #[error("Write to {table} failed: {source}")]
    Write {
        table: &'static str,
        #[source]
        source: StoreError,
    },
    /// A trade fan-out stopped part way; `completed` tables already hold the rows.
    #[error("Fan-out to {failed} failed after writing {completed:?}: {source}")]
    PartialFanout {
        failed: &'static str,
        completed: Vec<&'static str>,
        #[source]
        source: StoreError,
    },
    #[error("Read failed: {0}")]
    Read(StoreError),
    /// The request cannot be served by any table; nothing was sent to the store.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Generation failed: {0}")]
    Generation(#[from] GeneratorError),
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        AppError::InvalidQuery(msg.into())
    }
}
