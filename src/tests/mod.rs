#[cfg(test)]
mod tests {
    use crate::catalog::{Metric, MetricsCatalog};
    use crate::error::{AdapterError, QueryError};
    use crate::executor::{QueryExecutor, QueryResultRow};
    use crate::provider::Provider;
    use crate::selector::{Operator, Requirement, Selector};
    use async_trait::async_trait;
    use mockall::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    mock! {
        pub Executor {}
        #[async_trait]
        impl QueryExecutor for Executor {
            async fn execute(&self, account_id: i64, query: &str) -> Result<Vec<QueryResultRow>, QueryError>;
        }
    }

    /// Remembers every query it was asked to run and answers with a fixed row.
    #[derive(Clone, Default)]
    struct RecordingExecutor {
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingExecutor {
        fn last_query(&self) -> String {
            self.queries.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueryExecutor for RecordingExecutor {
        async fn execute(&self, _account_id: i64, query: &str) -> Result<Vec<QueryResultRow>, QueryError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(vec![sample_row(1.0)])
        }
    }

    struct SlowExecutor;

    #[async_trait]
    impl QueryExecutor for SlowExecutor {
        async fn execute(&self, _account_id: i64, _query: &str) -> Result<Vec<QueryResultRow>, QueryError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![sample_row(1.0)])
        }
    }

    const TIMESTAMP_MS: i64 = 1634567890123;

    fn sample_row(value: f64) -> QueryResultRow {
        match json!({"timestamp": TIMESTAMP_MS, "value": value}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn catalog(add_cluster_filter: bool) -> MetricsCatalog {
        let metric = Metric {
            query: "select test from testSample".to_string(),
            add_cluster_filter,
        };
        [("test", metric)].into_iter().collect()
    }

    fn requirement(key: &str, operator: Operator, values: &[&str]) -> Requirement {
        Requirement::new(key, operator, values.iter().copied()).unwrap()
    }

    async fn recorded_query(selector: Option<&Selector>, add_cluster_filter: bool) -> String {
        let executor = RecordingExecutor::default();
        let provider = Provider::new(
            catalog(add_cluster_filter),
            Box::new(executor.clone()),
            1,
            "testCluster",
        );

        provider
            .get_value("test", selector)
            .await
            .expect("unexpected error while getting value");
        executor.last_query()
    }

    #[tokio::test]
    async fn test_query_without_selector() {
        assert_eq!(recorded_query(None, false).await, "select test from testSample limit 1");
        assert_eq!(
            recorded_query(Some(&Selector::new()), false).await,
            "select test from testSample limit 1"
        );
    }

    #[tokio::test]
    async fn test_query_with_equality_selector() {
        let selector = Selector::new().add(requirement("key", Operator::Equals, &["value"]));
        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where key = 'value' limit 1"
        );

        let selector = selector.add(requirement("key2", Operator::Equals, &["value"]));
        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where key = 'value' and key2 = 'value' limit 1"
        );
    }

    #[tokio::test]
    async fn test_query_with_set_selectors() {
        let selector = Selector::new()
            .add(requirement("key", Operator::In, &["value", "15", "18"]))
            .add(requirement("key2", Operator::NotIn, &["value2", "16"]));

        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where key IN (15, 18, 'value') and key2 NOT IN (16, 'value2') limit 1"
        );
    }

    #[tokio::test]
    async fn test_query_with_existence_selectors() {
        let selector = Selector::new()
            .add(requirement("key", Operator::Exists, &[]))
            .add(requirement("key2", Operator::DoesNotExist, &[]));

        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where key IS NOT NULL and key2 IS NULL limit 1"
        );
    }

    #[tokio::test]
    async fn test_query_with_mixed_selectors() {
        let selector = Selector::new()
            .add(requirement("key", Operator::Exists, &[]))
            .add(requirement("key2", Operator::DoesNotExist, &[]))
            .add(requirement("key3", Operator::In, &["value", "1", "2"]))
            .add(requirement("key4", Operator::NotIn, &["value2", "3"]))
            .add(requirement("key5", Operator::GreaterThan, &["4"]))
            .add(requirement("key6", Operator::NotEquals, &["1234.1234"]));

        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where \
             key IS NOT NULL and key2 IS NULL and \
             key3 IN (1, 2, 'value') and key4 NOT IN (3, 'value2') \
             and key5 > 4 and key6 != 1234.1234 limit 1"
        );
    }

    #[tokio::test]
    async fn test_query_with_parsed_selector() {
        let selector: Selector = "key2 notin (value2, 16), key in (value, 15, 18)".parse().unwrap();

        assert_eq!(
            recorded_query(Some(&selector), false).await,
            "select test from testSample where key IN (15, 18, 'value') and key2 NOT IN (16, 'value2') limit 1"
        );
    }

    #[tokio::test]
    async fn test_cluster_name_clause_is_added() {
        let selector = Selector::new().add(requirement("key", Operator::Exists, &[]));

        assert_eq!(
            recorded_query(Some(&selector), true).await,
            "select test from testSample where clusterName='testCluster' where key IS NOT NULL limit 1"
        );
        assert_eq!(
            recorded_query(None, true).await,
            "select test from testSample where clusterName='testCluster' limit 1"
        );
    }

    #[tokio::test]
    async fn test_value_and_timestamp_are_returned() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .withf(|account_id, query| {
                *account_id == 7 && query.to_string() == "select test from testSample limit 1"
            })
            .times(1)
            .returning(|_, _| Ok(vec![sample_row(12.25)]));

        let provider = Provider::new(catalog(false), Box::new(executor), 7, "testCluster");
        let sample = provider.get_value("test", None).await.unwrap();

        assert_eq!(sample.value, 12.25);
        assert_eq!(sample.timestamp.timestamp_millis(), TIMESTAMP_MS);
    }

    #[tokio::test]
    async fn test_unknown_metric_runs_no_query() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().never();

        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        let err = provider.get_value("unknown", None).await.unwrap_err();

        assert!(matches!(err, AdapterError::MetricNotSupported(name) if name == "unknown"));
    }

    #[tokio::test]
    async fn test_empty_result() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().times(1).returning(|_, _| Ok(Vec::new()));

        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        let err = provider.get_value("test", None).await.unwrap_err();

        assert!(matches!(err, AdapterError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn test_row_without_value_is_malformed() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().times(1).returning(|_, _| {
            let mut row = sample_row(1.0);
            row.remove("value");
            Ok(vec![row])
        });

        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        let err = provider.get_value("test", None).await.unwrap_err();

        assert!(matches!(err, AdapterError::MalformedResult(_)));
    }

    #[tokio::test]
    async fn test_backend_error_is_propagated() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .times(1)
            .returning(|_, _| Err(QueryError::Backend(vec!["NRQL Syntax Error".to_string()])));

        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        let err = provider.get_value("test", None).await.unwrap_err();

        match err {
            AdapterError::QueryExecution(QueryError::Backend(messages)) => {
                assert_eq!(messages, vec!["NRQL Syntax Error"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let provider = Provider::new(catalog(false), Box::new(SlowExecutor), 1, "testCluster")
            .with_query_timeout(Duration::from_millis(20));

        let err = provider.get_value("test", None).await.unwrap_err();

        assert!(matches!(
            err,
            AdapterError::QueryExecution(QueryError::Timeout(d)) if d == Duration::from_millis(20)
        ));
    }

    #[tokio::test]
    async fn test_every_call_queries_again() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .times(3)
            .returning(|_, _| Ok(vec![sample_row(1.0)]));

        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        for _ in 0..3 {
            provider.get_value("test", None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_are_not_merged() {
        let executor = RecordingExecutor::default();
        let provider = Provider::new(catalog(false), Box::new(executor.clone()), 1, "testCluster");

        let (a, b) = tokio::join!(provider.get_value("test", None), provider.get_value("test", None));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(executor.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_external_metric_carries_equality_labels() {
        let executor = RecordingExecutor::default();
        let provider = Provider::new(catalog(false), Box::new(executor), 1, "testCluster");
        let selector: Selector = "app=web,tier!=db".parse().unwrap();

        let metric = provider.get_external_metric("test", Some(&selector)).await.unwrap();

        assert_eq!(metric.metric_name, "test");
        assert_eq!(metric.metric_labels.len(), 1);
        assert_eq!(metric.metric_labels["app"], "web");
        assert_eq!(metric.milli_value(), 1000);
    }

    #[test]
    fn test_build_query_is_synchronous() {
        let provider = Provider::new(catalog(true), Box::new(RecordingExecutor::default()), 1, "testCluster");
        let selector = Selector::new().add(requirement("key", Operator::Equals, &["value"]));

        let query = provider.build_query("test", Some(&selector)).unwrap();
        assert_eq!(
            query,
            "select test from testSample where clusterName='testCluster' where key = 'value' limit 1"
        );

        let result = tokio_test::block_on(provider.get_value("test", Some(&selector)));
        assert!(result.is_ok());
    }
}
