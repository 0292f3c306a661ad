//! Checkpoint command implementation.

use ledgerlink_queue::OfflineQueue;

/// Compacts the queue journal down to live entries.
pub fn run(queue: &OfflineQueue) -> Result<(), Box<dyn std::error::Error>> {
    let before = queue.depth();
    queue.checkpoint()?;
    println!("journal compacted; {before} live entries retained");
    Ok(())
}
