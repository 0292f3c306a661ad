//! The sync coordinator.
//!
//! Front door for all engine traffic. Business events go direct while the
//! engine is reachable and fall into the offline queue otherwise; queued
//! work drains in enqueue order once connectivity returns. Read queries
//! are answered live or not at all.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::state::{ConnectionState, ConnectionTracker};
use crate::transport::EngineTransport;
use ledgerlink_protocol::{
    decode_response, encode, Acceptance, CompanyContext, DomainRecord, EngineRejection,
    EngineResult, LedgerMaster, ReportData, ReportQuery, TransientReason,
};
use ledgerlink_queue::{Disposition, OfflineQueue, QueueError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Current coordinator view for operators and embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Entries awaiting delivery.
    pub queue_depth: usize,
}

/// Why a drain stopped before the queue emptied.
#[derive(Debug, Clone, PartialEq)]
pub enum DrainHalt {
    /// A delivery failed transiently; the remaining entries stay queued
    /// and the coordinator drops back to offline probing.
    Transient(TransientReason),
    /// The engine rejected an entry. Later entries may depend on it, so
    /// they stay queued until an operator intervenes.
    Rejected {
        /// The rejected entry.
        seq: u64,
        /// The engine's rejection.
        rejection: EngineRejection,
    },
    /// One entry has exhausted its attempt budget and needs an operator
    /// to cancel or investigate it.
    AttemptsExhausted {
        /// The stuck entry.
        seq: u64,
        /// Attempts made.
        attempts: u32,
    },
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    /// Entries fully accepted by the engine.
    pub delivered: u32,
    /// Entries partially accepted and retired.
    pub partial: u32,
    /// Entries definitively rejected and retired.
    pub rejected: u32,
    /// Set when the pass stopped early.
    pub halted: Option<DrainHalt>,
    /// Entries still pending after the pass.
    pub remaining: usize,
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Coordinates direct delivery, offline queueing and replay.
pub struct SyncCoordinator<T: EngineTransport> {
    config: SyncConfig,
    ctx: CompanyContext,
    transport: Arc<T>,
    queue: Arc<OfflineQueue>,
    tracker: ConnectionTracker,
    // Serializes drain passes; replay order depends on it.
    drain_gate: Mutex<()>,
}

impl<T: EngineTransport> SyncCoordinator<T> {
    /// Creates a coordinator. It starts offline; the first probe or
    /// successful delivery promotes it.
    pub fn new(config: SyncConfig, transport: Arc<T>, queue: Arc<OfflineQueue>) -> Self {
        let ctx = match &config.company {
            Some(company) => CompanyContext::named(company.clone()),
            None => CompanyContext::active(),
        };
        Self {
            config,
            ctx,
            transport,
            queue,
            tracker: ConnectionTracker::new(),
            drain_gate: Mutex::new(()),
        }
    }

    /// The coordinator's configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The offline queue behind this coordinator.
    #[must_use]
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    /// Connection state plus queue depth.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.tracker.state(),
            queue_depth: self.queue.depth(),
        }
    }

    /// Runs a reachability probe unless one is already in flight or the
    /// coordinator is online. Returns the state after the probe.
    pub fn probe(&self) -> ConnectionState {
        if self.tracker.try_begin_probe() {
            let up = self.transport.ping(self.config.probe_timeout);
            self.tracker.finish_probe(up);
            info!(up, "engine probe finished");
        }
        self.tracker.state()
    }

    /// Submits one record.
    ///
    /// Business events are delivered directly when online; on transient
    /// failure, or while offline, they are queued and the call reports
    /// [`TransientReason::QueuedOffline`]. Duplicate submissions of
    /// content already pending collapse onto the existing entry. Read
    /// queries are never queued: offline they report the engine as
    /// unreachable.
    ///
    /// # Errors
    ///
    /// Fails on invalid records and on queue storage errors. Engine-side
    /// rejection is not an error; it comes back inside the result.
    pub fn submit(&self, record: DomainRecord) -> SyncResult<EngineResult> {
        record.validate()?;

        if !record.is_business_event() {
            if self.tracker.state() != ConnectionState::Online {
                self.probe();
            }
            if self.tracker.state() != ConnectionState::Online {
                return Ok(EngineResult::TransientFailure(TransientReason::Unreachable(
                    "engine offline; read queries are not queued".into(),
                )));
            }
            return Ok(self.deliver(&record));
        }

        if self.tracker.state() == ConnectionState::Online {
            let result = self.deliver(&record);
            if !result.is_transient() {
                return Ok(result);
            }
            debug!(kind = record.kind_name(), "direct delivery failed, queueing");
        }

        self.queue.enqueue(record, now_ms())?;
        Ok(EngineResult::TransientFailure(TransientReason::QueuedOffline))
    }

    /// Replays eligible queued entries in enqueue order.
    ///
    /// Full and partial acceptances retire their entry and the pass
    /// continues. Anything else halts the pass: order must hold, so
    /// nothing behind a failed or rejected entry may jump it. At most
    /// one drain runs at a time; concurrent callers wait their turn.
    ///
    /// # Errors
    ///
    /// Fails on queue storage errors.
    pub fn drain(&self) -> SyncResult<DrainReport> {
        let _gate = self.drain_gate.lock();
        let eligible = self.queue.next_eligible(now_ms());
        let mut report = DrainReport {
            delivered: 0,
            partial: 0,
            rejected: 0,
            halted: None,
            remaining: 0,
        };

        for entry in eligible {
            let result = self.deliver(&entry.record);
            let disposition = match self.queue.mark_outcome(entry.seq, &result, now_ms()) {
                Ok(disposition) => disposition,
                Err(QueueError::UnknownEntry { seq }) => {
                    // Cancelled through a direct queue handle after the
                    // send went out; the outcome has nowhere to land.
                    warn!(seq, "entry cancelled while in flight");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            match &result {
                EngineResult::Success(_) => report.delivered += 1,
                EngineResult::PartialSuccess { accepted, errors } => {
                    warn!(
                        seq = entry.seq,
                        accepted,
                        errors = errors.len(),
                        "entry partially accepted, retired"
                    );
                    report.partial += 1;
                }
                EngineResult::PermanentFailure(rejection) => {
                    // Later entries may reference masters this one should
                    // have created; do not let them jump ahead.
                    warn!(seq = entry.seq, %rejection, "entry rejected, halting drain");
                    report.rejected += 1;
                    report.halted = Some(DrainHalt::Rejected {
                        seq: entry.seq,
                        rejection: rejection.clone(),
                    });
                    break;
                }
                EngineResult::TransientFailure(reason) => {
                    report.halted = match disposition {
                        Disposition::Retry { attempts, .. }
                            if attempts >= self.config.max_attempts =>
                        {
                            warn!(seq = entry.seq, attempts, "entry exhausted its attempts");
                            Some(DrainHalt::AttemptsExhausted {
                                seq: entry.seq,
                                attempts,
                            })
                        }
                        _ => Some(DrainHalt::Transient(reason.clone())),
                    };
                    break;
                }
            }
        }

        report.remaining = self.queue.depth();
        info!(
            delivered = report.delivered,
            partial = report.partial,
            rejected = report.rejected,
            remaining = report.remaining,
            halted = report.halted.is_some(),
            "drain pass finished"
        );
        Ok(report)
    }

    /// Whether a ledger master exists in the engine.
    ///
    /// # Errors
    ///
    /// Fails when the engine cannot be reached; existence cannot be
    /// answered from local state.
    pub fn ledger_exists(&self, name: &str) -> SyncResult<bool> {
        let query = DomainRecord::Report(ReportQuery::LedgerLookup { name: name.into() });
        match self.submit(query)? {
            EngineResult::Success(acceptance) => Ok(matches!(
                acceptance.report,
                Some(ReportData::LedgerMaster(Some(_)))
            )),
            EngineResult::TransientFailure(reason) => Err(SyncError::EngineUnavailable(reason)),
            EngineResult::PartialSuccess { .. } | EngineResult::PermanentFailure(_) => Ok(false),
        }
    }

    /// Creates a ledger master unless it already exists.
    ///
    /// When the engine is reachable and the ledger is present this is a
    /// no-op reported as a zero-count success. Offline, the create is
    /// queued; replaying a create for a ledger that meanwhile exists is
    /// safe because the engine suppresses duplicate masters.
    ///
    /// # Errors
    ///
    /// Fails on invalid records and queue storage errors.
    pub fn ensure_ledger(&self, master: LedgerMaster) -> SyncResult<EngineResult> {
        if self.tracker.state() == ConnectionState::Online {
            if let Ok(true) = self.ledger_exists(&master.name) {
                debug!(name = %master.name, "ledger already exists");
                return Ok(EngineResult::Success(Acceptance::imported(0, 0, None)));
            }
        }
        self.submit(DomainRecord::Ledger(master))
    }

    /// Cancels a pending queue entry.
    ///
    /// Waits for any running drain pass to finish first, so an entry
    /// whose send is already in flight has its outcome recorded before
    /// the cancel is considered.
    ///
    /// # Errors
    ///
    /// Fails if the entry is unknown or already retired.
    pub fn cancel(&self, seq: u64) -> SyncResult<()> {
        let _gate = self.drain_gate.lock();
        self.queue.cancel(seq)?;
        Ok(())
    }

    fn deliver(&self, record: &DomainRecord) -> EngineResult {
        let envelope = encode(record, &self.ctx);
        match self.transport.send(&envelope, self.config.timeout) {
            Ok(body) => {
                self.tracker.mark_online();
                decode_response(envelope.shape, &body)
            }
            Err(err) => {
                debug!(%err, "transport failure");
                self.tracker.mark_offline();
                EngineResult::TransientFailure(err.reason())
            }
        }
    }
}
