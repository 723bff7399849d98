use thiserror::Error;

#[derive(Debug, Error)]
pub enum WiqError {
    #[error("not initialized: run 'wiq init'")]
    NotInitialized,

    #[error("work item not in cache: {0}")]
    NotCached(u64),

    #[error("invalid work item batch at index {index}: {reason}")]
    InvalidBatch { index: usize, reason: String },

    #[error("invalid query results: {0}")]
    InvalidQueryResults(String),

    #[error("no expected ids: supply query results or run 'wiq sync check'")]
    NoExpectedIds,

    #[error("unknown query label: {0}")]
    UnknownQuery(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WiqError>;
