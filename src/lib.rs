//! NRQL Metrics Adapter: external metrics for autoscalers, answered by NRQL
//!
//! An autoscaling controller asks for a named metric narrowed by a label
//! selector. The adapter looks the metric up in its catalog, turns the
//! selector into NRQL conditions, runs the resulting query and hands back a
//! single value with its timestamp.
//!
//! # Example
//!
//! ```rust,no_run
//! use nrql_metrics_adapter::{AdapterSettings, NerdGraphClient, Provider, Selector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load settings and the metric catalog
//!     let settings = AdapterSettings::new(None)?;
//!
//!     // Create the NerdGraph query executor
//!     let client = NerdGraphClient::from_settings(&settings).ok_or("no API key configured")?;
//!
//!     let provider = Provider::new(
//!         settings.catalog(),
//!         Box::new(client),
//!         settings.account_id,
//!         settings.cluster_name.clone(),
//!     )
//!     .with_query_timeout(settings.query_timeout());
//!
//!     // Fetch one value
//!     let selector: Selector = "app=checkout,env in (prod, staging)".parse()?;
//!     let sample = provider.get_value("queue_depth", Some(&selector)).await?;
//!     println!("queue_depth = {} at {}", sample.value, sample.timestamp);
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod nerdgraph;
pub mod provider;
pub mod query;
pub mod selector;
pub mod translate;
pub mod tests;

pub use catalog::{Metric, MetricsCatalog};
pub use config::{AdapterSettings, Region};
pub use error::{AdapterError, AdapterResult, QueryError};
pub use executor::{QueryExecutor, QueryResultRow};
pub use nerdgraph::NerdGraphClient;
pub use provider::{ExternalMetricValue, MetricValue, Provider};
pub use selector::{Operator, Requirement, Selector};
