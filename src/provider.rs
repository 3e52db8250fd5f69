use crate::catalog::MetricsCatalog;
use crate::error::{AdapterError, AdapterResult, QueryError};
use crate::executor::{QueryExecutor, QueryResultRow};
use crate::query;
use crate::selector::Selector;
use crate::translate;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// A single sample read back from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Metric sample in the shape served by an external metrics API.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMetricValue {
    pub metric_name: String,
    pub metric_labels: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl ExternalMetricValue {
    /// The value in integer thousandths, as carried by a Kubernetes quantity.
    pub fn milli_value(&self) -> i64 {
        (self.value * 1000.0).round() as i64
    }
}

/// Answers metric requests by running the metric's NRQL query.
///
/// Holds no mutable state; a single provider can serve concurrent callers.
pub struct Provider {
    catalog: MetricsCatalog,
    executor: Box<dyn QueryExecutor>,
    account_id: i64,
    cluster_name: String,
    query_timeout: Duration,
}

impl Provider {
    pub fn new(
        catalog: MetricsCatalog,
        executor: Box<dyn QueryExecutor>,
        account_id: i64,
        cluster_name: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            executor,
            account_id,
            cluster_name: cluster_name.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn catalog(&self) -> &MetricsCatalog {
        &self.catalog
    }

    /// The NRQL statement that answers `metric_name` for `selector`.
    pub fn build_query(&self, metric_name: &str, selector: Option<&Selector>) -> AdapterResult<String> {
        let metric = self
            .catalog
            .get(metric_name)
            .ok_or_else(|| AdapterError::MetricNotSupported(metric_name.to_string()))?;

        let fragment = translate::to_where_fragment(selector)?;

        Ok(query::assemble(
            &metric.query,
            &self.cluster_name,
            metric.add_cluster_filter,
            &fragment,
        ))
    }

    /// Fetches the current value of `metric_name`.
    ///
    /// Every call runs a fresh query. The query is abandoned once the
    /// configured timeout elapses, and also when the returned future is
    /// dropped.
    pub async fn get_value(&self, metric_name: &str, selector: Option<&Selector>) -> AdapterResult<MetricValue> {
        let query = self.build_query(metric_name, selector)?;
        debug!(metric = metric_name, account_id = self.account_id, %query, "executing metric query");

        let rows = tokio::time::timeout(self.query_timeout, self.executor.execute(self.account_id, &query))
            .await
            .map_err(|_| QueryError::Timeout(self.query_timeout))
            .and_then(|result| result)
            .map_err(|e| {
                warn!(metric = metric_name, %query, error = %e, "metric query failed");
                AdapterError::QueryExecution(e)
            })?;

        extract_value(rows, &query)
    }

    /// Like [`Provider::get_value`], labelled with the selector's equality
    /// requirements.
    pub async fn get_external_metric(
        &self,
        metric_name: &str,
        selector: Option<&Selector>,
    ) -> AdapterResult<ExternalMetricValue> {
        let sample = self.get_value(metric_name, selector).await?;

        Ok(ExternalMetricValue {
            metric_name: metric_name.to_string(),
            metric_labels: selector.map(Selector::equality_labels).unwrap_or_default(),
            timestamp: sample.timestamp,
            value: sample.value,
        })
    }
}

fn extract_value(rows: Vec<QueryResultRow>, query: &str) -> AdapterResult<MetricValue> {
    if rows.len() > 1 {
        warn!(rows = rows.len(), %query, "expected a single row, using the first");
    }

    let row = rows.into_iter().next().ok_or_else(|| AdapterError::EmptyResult {
        query: query.to_string(),
    })?;

    let value = row
        .get("value")
        .and_then(Value::as_f64)
        .ok_or_else(|| AdapterError::MalformedResult("row has no numeric `value` field".to_string()))?;

    let timestamp = row
        .get("timestamp")
        .ok_or_else(|| AdapterError::MalformedResult("row has no `timestamp` field".to_string()))
        .and_then(parse_timestamp)?;

    Ok(MetricValue { value, timestamp })
}

/// Accepts epoch milliseconds or an RFC 3339 string.
fn parse_timestamp(raw: &Value) -> AdapterResult<DateTime<Utc>> {
    let parsed = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|ms| ms.round() as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    };

    parsed.ok_or_else(|| AdapterError::MalformedResult(format!("unreadable timestamp {raw}")))
}
