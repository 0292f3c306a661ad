//! Status command implementation.

use ledgerlink_sync::{EngineTransport, SyncCoordinator};

/// Runs the status command: probes once, then reports.
pub fn run<T: EngineTransport>(
    coordinator: &SyncCoordinator<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    coordinator.probe();
    let status = coordinator.status();
    println!("engine:  {}", status.state.as_str());
    println!("pending: {} entries", status.queue_depth);
    Ok(())
}
