//! Heartbeat liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::hub::Relay;

/// Periodic heartbeat over every session.
///
/// Each tick runs [`Relay::sweep`]: a session that has not acknowledged
/// the previous probe is evicted, every other session is probed again.
/// A session therefore survives between one and two intervals of
/// silence.
pub struct LivenessMonitor {
    relay: Arc<Relay>,
    interval: Duration,
    cancel: CancellationToken,
}

impl LivenessMonitor {
    pub fn new(relay: Arc<Relay>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            relay,
            interval,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Liveness monitor started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.relay.sweep();
                    if !evicted.is_empty() {
                        tracing::info!(count = evicted.len(), "Heartbeat sweep evicted sessions");
                    }
                }
                () = self.cancel.cancelled() => {
                    tracing::info!("Liveness monitor stopped");
                    return;
                }
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
