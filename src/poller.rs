use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{Inner, refresh_once};

/// Background refresh schedule: a fixed interval plus debounced on-demand
/// wakeups requested after commands. Runs until cancelled.
///
/// A failed refresh flags the cache unavailable and the schedule keeps
/// going; the next cycle is the retry.
pub(crate) async fn run(inner: Arc<Inner>, interval: Duration, cancel: CancellationToken) {
    // connect() already refreshed once; the first tick lands a full
    // period later.
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = inner.refresh_notify.notified() => {}
        }
        inner.refresh_pending.store(false, Ordering::SeqCst);

        tokio::select! {
            biased;
            // dropping the in-flight refresh closes its socket; nothing
            // is committed after cancellation
            _ = cancel.cancelled() => break,
            result = refresh_once(&inner) => match result {
                Ok(snapshot) => debug!(
                    aircons = snapshot.aircons.len(),
                    zones = snapshot.zones.len(),
                    "scheduled refresh complete"
                ),
                Err(e) => warn!(error = %e, "scheduled refresh failed"),
            }
        }
    }
    debug!("poller stopped");
}
