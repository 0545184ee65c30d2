//! Document store error types.
//!
//! Every variant names the table (or root directory) involved and keeps the
//! underlying cause reachable through `Error::source`.

use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The table name cannot be mapped to a single file under the root.
    #[error("invalid table name `{0}`")]
    InvalidTableName(String),

    /// Failed to create the root directory.
    #[error("failed to create store directory {path}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to enumerate tables in the root directory.
    #[error("failed to list tables in {path}")]
    ListTables {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure while reading, writing or removing a table file.
    #[error("I/O failure on table `{table}`")]
    Io {
        table: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize table `{table}`")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// The table file exists but does not hold the expected JSON shape.
    #[error("malformed content in table `{table}`")]
    Deserialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// The blocking task behind an async operation panicked or was cancelled.
    #[error("background task for table `{table}` failed")]
    Background {
        table: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl StoreError {
    /// Table the failure relates to, when there is one.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::InvalidTableName(table)
            | Self::Io { table, .. }
            | Self::Serialize { table, .. }
            | Self::Deserialize { table, .. }
            | Self::Background { table, .. } => Some(table.as_str()),
            Self::CreateRoot { .. } | Self::ListTables { .. } => None,
        }
    }
}
