//! [`QueryExecutor`] backed by the NerdGraph GraphQL API.

use crate::config::{AdapterSettings, Region};
use crate::error::QueryError;
use crate::executor::{QueryExecutor, QueryResultRow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const NRQL_DOCUMENT: &str = "query($accountId: Int!, $nrql: Nrql!) { actor { account(id: $accountId) { nrql(query: $nrql) { results } } } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Clone)]
pub struct NerdGraphClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl NerdGraphClient {
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            client: Client::new(),
            endpoint: region.graphql_endpoint().to_string(),
            api_key: api_key.into(),
        }
    }

    /// Returns `None` when no API key was configured.
    pub fn from_settings(settings: &AdapterSettings) -> Option<Self> {
        settings
            .api_key()
            .map(|api_key| Self::new(api_key, settings.region))
    }

    /// Points the client at a different GraphQL endpoint, e.g. a proxy.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn request_body(account_id: i64, query: &str) -> Value {
    json!({
        "query": NRQL_DOCUMENT,
        "variables": {
            "accountId": account_id,
            "nrql": query,
        },
    })
}

fn decode_results(response: GraphQlResponse) -> Result<Vec<QueryResultRow>, QueryError> {
    if !response.errors.is_empty() {
        return Err(QueryError::Backend(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }

    let results = response
        .data
        .as_ref()
        .and_then(|data| data.pointer("/actor/account/nrql/results"))
        .ok_or_else(|| QueryError::Decode("response has no nrql results".to_string()))?;

    serde_json::from_value(results.clone())
        .map_err(|e| QueryError::Decode(format!("unexpected result rows: {}", e)))
}

fn status_error<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> QueryError {
    let body = body.unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    QueryError::Status { status, body }
}

#[async_trait]
impl QueryExecutor for NerdGraphClient {
    async fn execute(&self, account_id: i64, query: &str) -> Result<Vec<QueryResultRow>, QueryError> {
        debug!(endpoint = %self.endpoint, account_id, "sending NRQL query");

        let response = self
            .client
            .post(&self.endpoint)
            .header("API-Key", &self.api_key)
            .json(&request_body(account_id, query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), response.text().await));
        }

        let answer: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))?;

        decode_results(answer)
    }
}
