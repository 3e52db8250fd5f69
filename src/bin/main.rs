//! Command-line front end for the adapter.
//!
//! ```text
//! Options:
//!   -c, --config <FILE>        Settings file layered over config/*.toml [env: NRQL_ADAPTER_CONFIG]
//!   -m, --metric <NAME>        Metric to fetch (repeatable)
//!   -l, --selector <TEXT>      Label selector applied to every metric, e.g. "app=web,tier in (a, b)"
//!       --list                 Print the configured metric names and exit
//! ```
//!
//! Logging is controlled through `RUST_LOG` (default `info`).

use clap::Parser;
use futures::future::join_all;
use nrql_metrics_adapter::{AdapterSettings, NerdGraphClient, Provider, Selector};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct CliArgs {
    /// Path to the settings file
    #[arg(short, long, value_name = "FILE", env = "NRQL_ADAPTER_CONFIG")]
    config: Option<PathBuf>,

    /// Metric to fetch
    #[arg(short, long = "metric", value_name = "NAME")]
    metrics: Vec<String>,

    /// Label selector applied to every requested metric
    #[arg(short = 'l', long, value_name = "TEXT")]
    selector: Option<String>,

    /// List configured metrics and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = CliArgs::parse();
    let settings = AdapterSettings::new(cli.config.as_deref())?;
    let catalog = settings.catalog();

    if cli.list {
        for name in catalog.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let selector = cli.selector.as_deref().map(str::parse::<Selector>).transpose()?;

    let client = NerdGraphClient::from_settings(&settings)
        .ok_or("no API key configured (set api_key or NEWRELIC_API_KEY)")?;
    info!(
        endpoint = client.endpoint(),
        account_id = settings.account_id,
        metrics = catalog.len(),
        "adapter configured"
    );

    let provider = Provider::new(
        catalog,
        Box::new(client),
        settings.account_id,
        settings.cluster_name.clone(),
    )
    .with_query_timeout(settings.query_timeout());

    let results = join_all(
        cli.metrics
            .iter()
            .map(|name| provider.get_external_metric(name, selector.as_ref())),
    )
    .await;

    let mut failed = 0;
    for (name, result) in cli.metrics.iter().zip(results) {
        match result {
            Ok(metric) => println!(
                "{} = {} ({}m) at {} {:?}",
                name,
                metric.value,
                metric.milli_value(),
                metric.timestamp.to_rfc3339(),
                metric.metric_labels
            ),
            Err(e) => {
                error!(metric = %name, error = %e, "failed to fetch metric");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} metrics failed", failed, cli.metrics.len()).into());
    }

    Ok(())
}
