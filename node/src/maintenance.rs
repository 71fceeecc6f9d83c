//! Periodic registry maintenance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

use crate::service::SafenodeService;

/// A running maintenance loop. Dropping it without [`MaintenanceTask::stop`]
/// also ends the loop at its next wake-up.
pub struct MaintenanceTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

impl MaintenanceTask {
    /// Stop the loop and wait for it. Resolves to the number of passes run.
    pub async fn stop(self) -> Result<u64, JoinError> {
        let _ = self.stop.send(());
        self.handle.await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run [`SafenodeService::run_maintenance`] every `interval` until stopped.
///
/// The first pass runs immediately.
pub fn spawn_maintenance(service: Arc<SafenodeService>, interval: Duration) -> MaintenanceTask {
    let (stop, mut stop_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut passes = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => {
                    tracing::info!(passes, "maintenance task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let update = service.run_maintenance();
                    passes += 1;
                    if !update.removed.is_empty() {
                        tracing::info!(
                            removed = update.removed.len(),
                            total = update.total,
                            "spent safenodes removed"
                        );
                    }
                }
            }
        }
        passes
    });
    MaintenanceTask { stop, handle }
}
