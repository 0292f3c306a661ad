//! Cancel command implementation.

use ledgerlink_queue::OfflineQueue;

/// Drops a pending entry without delivering it.
pub fn run(queue: &OfflineQueue, seq: u64) -> Result<(), Box<dyn std::error::Error>> {
    let entry = queue.cancel(seq)?;
    println!("cancelled entry {} ({})", entry.seq, entry.record.kind_name());
    Ok(())
}
