//! Command handlers.

use muster::{Muster, MusterConfig, MusterResult};
use std::convert::Infallible;
use tracing::{info, warn};

/// Bootstrap, flush every interval until Ctrl-C, then flush once more.
///
/// A second Ctrl-C abandons the final flush if it is stuck retrying.
pub async fn run(config: MusterConfig) -> MusterResult<()> {
    let muster = Muster::bootstrap(&config).await?;
    let rows = muster.repository().lock().tables().total_rows();
    info!(
        rows,
        backend = %config.database().backend(),
        interval_secs = config.flush().interval_secs(),
        "Muster running. Press CTRL+C to stop."
    );

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for CTRL+C; stopping");
        }
    };

    // Watches for a second CTRL+C while the final flush is retrying
    let watcher = async {
        second_interrupt().await;
        warn!("Second CTRL+C; abandoning final flush");
        muster.signal_shutdown();
        std::future::pending::<Infallible>().await
    };

    let report = tokio::select! {
        result = muster.run_until(stop) => result?,
        never = watcher => match never {},
    };
    info!(statements = *report.statements(), "Stopped");
    Ok(())
}

async fn second_interrupt() {
    for _ in 0..2 {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Bootstrap and print what was loaded.
pub async fn check(config: MusterConfig) -> MusterResult<()> {
    let muster = Muster::bootstrap(&config).await?;
    println!("{:<20} {:>8}  fingerprint", "table", "rows");
    for status in muster.status() {
        println!(
            "{:<20} {:>8}  {}",
            status.table().sql_name(),
            status.rows(),
            status.fingerprint()
        );
    }
    println!(
        "global {}",
        muster.controller().global_fingerprint().await
    );
    Ok(())
}
