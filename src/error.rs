//! Error kinds surfaced by the adapter.

use std::time::Duration;
use thiserror::Error;

/// Failures of the query-execution capability.
///
/// These travel to the caller untouched inside [`AdapterError::QueryExecution`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend rejected query: {}", .0.join("; "))]
    Backend(Vec<String>),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("query did not complete within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("metric not supported: {0}")]
    MetricNotSupported(String),

    #[error("selector translation error: {0}")]
    SelectorTranslation(String),

    #[error("query execution error: {0}")]
    QueryExecution(#[from] QueryError),

    #[error("query returned no rows: {query}")]
    EmptyResult { query: String },

    #[error("malformed query result: {0}")]
    MalformedResult(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
