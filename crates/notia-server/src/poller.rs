//! Background ingestion on a fixed interval.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use notia::NotiaError;

use crate::state::AppState;

/// Starts the poller when a mailbox is configured and the interval is non-zero.
pub fn spawn(state: AppState, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
    let mailbox = state.service.config().ready_mailbox()?;
    if mailbox.poll_interval_secs == 0 {
        info!("Mailbox polling disabled (poll_interval_secs = 0)");
        return None;
    }
    let interval = Duration::from_secs(mailbox.poll_interval_secs);
    info!(interval_secs = mailbox.poll_interval_secs, "Starting mailbox poller");

    Some(tokio::spawn(run(state, interval, shutdown)))
}

async fn run(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    // First run one period after startup.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                debug!("Poller stopping");
                return;
            }
        }

        match state.service.trigger_ingestion().await {
            Ok(summary) => debug!(
                processed = summary.processed_count,
                skipped = summary.skipped_count,
                failed = summary.failed_count,
                "Scheduled ingestion finished"
            ),
            Err(NotiaError::Busy) => debug!("Ingestion already running, skipping tick"),
            Err(e) => warn!(error = %e, "Scheduled ingestion failed"),
        }
    }
}
