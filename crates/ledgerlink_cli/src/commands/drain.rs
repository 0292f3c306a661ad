//! Drain command implementation.

use ledgerlink_sync::{ConnectionState, DrainHalt, EngineTransport, SyncCoordinator};

/// Probes the engine, then replays queued entries.
pub fn run<T: EngineTransport>(
    coordinator: &SyncCoordinator<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    if coordinator.probe() != ConnectionState::Online {
        println!("engine is offline; nothing drained");
        println!("pending: {} entries", coordinator.status().queue_depth);
        return Ok(());
    }

    let report = coordinator.drain()?;
    println!("delivered: {}", report.delivered);
    if report.partial > 0 {
        println!("partial:   {}", report.partial);
    }
    if report.rejected > 0 {
        println!("rejected:  {}", report.rejected);
    }
    println!("remaining: {}", report.remaining);
    match report.halted {
        Some(DrainHalt::Transient(reason)) => {
            println!("halted: {reason}");
        }
        Some(DrainHalt::Rejected { seq, rejection }) => {
            println!("halted: entry {seq} rejected: {rejection}");
        }
        Some(DrainHalt::AttemptsExhausted { seq, attempts }) => {
            println!("halted: entry {seq} stuck after {attempts} attempts");
            println!("inspect it with `ledgerlink pending`, drop it with `ledgerlink cancel --seq {seq}`");
        }
        None => {}
    }
    Ok(())
}
