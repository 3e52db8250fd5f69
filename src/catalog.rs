use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A metric the adapter knows how to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// NRQL statement lacking only its filter and limit clauses.
    pub query: String,
    /// Scope the query to the configured cluster.
    #[serde(default)]
    pub add_cluster_filter: bool,
}

impl Metric {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            add_cluster_filter: false,
        }
    }

    pub fn with_cluster_filter(mut self) -> Self {
        self.add_cluster_filter = true;
        self
    }
}

/// Immutable metric-name to [`Metric`] mapping, cheap to clone and share
/// between concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct MetricsCatalog {
    metrics: Arc<HashMap<String, Metric>>,
}

impl MetricsCatalog {
    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Metric names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.metrics.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl From<HashMap<String, Metric>> for MetricsCatalog {
    fn from(metrics: HashMap<String, Metric>) -> Self {
        Self {
            metrics: Arc::new(metrics),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Metric)> for MetricsCatalog {
    fn from_iter<T: IntoIterator<Item = (K, Metric)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(name, metric)| (name.into(), metric))
            .collect::<HashMap<_, _>>()
            .into()
    }
}
