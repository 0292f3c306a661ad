//! Probe command implementation.

use ledgerlink_sync::{EngineTransport, SyncCoordinator};

/// Runs a single reachability probe.
pub fn run<T: EngineTransport>(
    coordinator: &SyncCoordinator<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = coordinator.probe();
    println!("engine is {}", state.as_str());
    Ok(())
}
