//! Metrics report example
//!
//! Prints the service status and a login summary for the last week.
//!
//! Run with:
//!   KB_METRICS_URL=https://kbase.us/services/kb_Metrics KB_AUTH_TOKEN=... \
//!     cargo run --example metrics_report

use kbmetrics::core::ObservabilityConfig;
use kbmetrics::{ClientBuilder, MetricsInputParams};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = ClientBuilder::from_env()?
        .with_observability(ObservabilityConfig::new("metrics-report").with_log_level("info"))
        .read_timeout(Some(Duration::from_secs(120)))
        .build()?;

    let status = client.status(None)?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if client.token().is_none() {
        println!("KB_AUTH_TOKEN not set; skipping authenticated queries");
        return Ok(());
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as i64;
    let week = 7 * 24 * 60 * 60 * 1000;
    let params = MetricsInputParams::new().with_epoch_range((now - week, now));

    tracing::info!("Fetching login totals");
    let logins = client.get_total_logins(&params, None)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&logins.metrics_result.unwrap_or_default())?
    );

    kbmetrics::core::shutdown_observability();
    Ok(())
}
