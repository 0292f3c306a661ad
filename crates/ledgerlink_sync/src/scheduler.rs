//! Background sync scheduler.

use crate::coordinator::SyncCoordinator;
use crate::state::ConnectionState;
use crate::transport::EngineTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// Periodically probes while offline and drains while online.
///
/// Runs on one plain thread; dropping the scheduler stops it and joins
/// the thread.
pub struct SyncScheduler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Starts the background loop over the given coordinator.
    pub fn start<T>(coordinator: Arc<SyncCoordinator<T>>) -> Self
    where
        T: EngineTransport + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                if coordinator.state() != ConnectionState::Online {
                    coordinator.probe();
                }
                if coordinator.state() == ConnectionState::Online
                    && coordinator.status().queue_depth > 0
                {
                    if let Err(err) = coordinator.drain() {
                        warn!(%err, "background drain failed");
                    }
                }
                sleep_interruptible(coordinator.config().sync_interval, &flag);
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the loop and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleeps in short slices so a stop request takes effect promptly.
fn sleep_interruptible(total: Duration, stop: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut slept = Duration::ZERO;
    while slept < total && !stop.load(Ordering::Relaxed) {
        let step = slice.min(total - slept);
        thread::sleep(step);
        slept += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::transport::MockTransport;
    use ledgerlink_queue::{BackoffPolicy, OfflineQueue};
    use ledgerlink_storage::InMemoryBackend;

    #[test]
    fn scheduler_stops_cleanly() {
        let queue = Arc::new(
            OfflineQueue::open(Box::new(InMemoryBackend::new()), BackoffPolicy::default())
                .unwrap(),
        );
        let transport = Arc::new(MockTransport::down());
        let config = SyncConfig::new("localhost", 9000)
            .with_sync_interval(Duration::from_millis(50));
        let coordinator = Arc::new(SyncCoordinator::new(config, transport, queue));
        let scheduler = SyncScheduler::start(Arc::clone(&coordinator));
        thread::sleep(Duration::from_millis(120));
        scheduler.stop();
    }
}
