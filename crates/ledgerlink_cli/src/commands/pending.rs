//! Pending command implementation.

use ledgerlink_queue::OfflineQueue;

/// Lists entries awaiting delivery, in replay order.
pub fn run(queue: &OfflineQueue) -> Result<(), Box<dyn std::error::Error>> {
    let entries = queue.pending();
    if entries.is_empty() {
        println!("queue is empty");
        return Ok(());
    }

    println!("{:>6}  {:<12} {:>8}  {}", "seq", "kind", "attempts", "fingerprint");
    for entry in entries {
        println!(
            "{:>6}  {:<12} {:>8}  {}",
            entry.seq,
            entry.record.kind_name(),
            entry.attempts,
            entry.fingerprint
        );
    }
    Ok(())
}
