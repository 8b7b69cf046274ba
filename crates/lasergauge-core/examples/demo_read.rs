//! Run the orchestrator against the simulated sensor bus.
//!
//! ```sh
//! cargo run --example demo_read
//! ```

use anyhow::Result;
use lasergauge_core::demo::DemoBus;
use lasergauge_core::gauge::{GaugeConfig, Limits, Orchestrator};
use lasergauge_core::protocol::CommandChannel;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bus = DemoBus::new().with_baselines(5.0, 3.0).spawn();
    let channel = Arc::new(CommandChannel::with_transport(bus));
    let mut gauge = Orchestrator::new(
        channel,
        GaugeConfig {
            ab_distance: 20.0,
            read_timeout_ms: 1000,
            ..Default::default()
        },
    );
    let limits = Limits {
        low: 11.9,
        high: 12.1,
    };

    let mut updates = gauge.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            if let Some(thickness) = update.thickness {
                println!(
                    "P{} thickness {:.2} ({:?})",
                    update.point,
                    thickness,
                    limits.classify(thickness)
                );
            }
        }
    });

    for cycle in 1..=3 {
        let ok = gauge.run_cycle().await;
        println!("cycle {cycle}: {ok}/16 reads ok");
    }

    gauge.close();
    printer.abort();
    Ok(())
}
