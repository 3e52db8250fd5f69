use crate::error::QueryError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One row of an NRQL result set, field name to value.
pub type QueryResultRow = Map<String, Value>;

/// Runs NRQL text against an account and hands back the raw rows.
///
/// Implementations must be safe to call from many tasks at once. Dropping the
/// returned future aborts the in-flight request.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, account_id: i64, query: &str) -> Result<Vec<QueryResultRow>, QueryError>;
}
