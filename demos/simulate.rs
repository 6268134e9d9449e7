//! Simulated print-job service.
//!
//! Runs the supervisor with its default random feed and simulated handler until
//! SIGINT/SIGTERM, then shuts down within the grace period.
//!
//! ```text
//! cargo run --example simulate
//! DEBUG=1 LOG_FORMAT=json cargo run --example simulate
//! ```

use std::env;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use jobvisor::{Supervisor, SupervisorConfig};

fn init_logging() -> Result<()> {
    let default_level = if env::var_os("DEBUG").is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cfg = SupervisorConfig::default();
    info!(
        grace = ?cfg.grace,
        poll_interval = ?cfg.poll_interval,
        max_in_flight = cfg.max_in_flight,
        "starting job simulation"
    );

    let sup = Supervisor::builder(cfg).build();
    let report = sup.run_until_signal().await?;

    info!(
        forced = report.forced,
        abandoned = report.abandoned,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "job simulation stopped"
    );
    Ok(())
}
