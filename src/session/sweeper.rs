//! Periodic eviction of expired sessions

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionStore;

/// Handle to a running sweeper task
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Session sweeper ended abnormally: {}", e);
        }
    }
}

/// Start a background task that sweeps `store` every `interval`
pub fn spawn_sweeper(store: Arc<SessionStore>, interval: Duration) -> SweeperHandle {
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = store.sweep();
                    if evicted > 0 {
                        tracing::info!("Swept {} expired session(s), {} remaining", evicted, store.count());
                    }
                }
                _ = stopped.changed() => break,
            }
        }

        tracing::debug!("Session sweeper stopped");
    });

    SweeperHandle { stop, task }
}
