//! The durable offline queue.
//!
//! Accepts business events while the engine is unreachable, persists them
//! through restarts, and hands them back in enqueue order for replay. All
//! state changes hit the journal before the in-memory view.

use crate::entry::{BackoffPolicy, QueueEntry, TerminalKind};
use crate::error::{QueueError, QueueResult};
use crate::journal::{Journal, JournalRecord};
use ledgerlink_protocol::{DomainRecord, EngineResult, Fingerprint};
use ledgerlink_storage::LogBackend;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// What happened when a record was offered to the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// The record is new and was appended.
    Accepted(QueueEntry),
    /// A pending entry with the same fingerprint already exists; the offer
    /// was dropped and the existing entry is returned.
    Duplicate(QueueEntry),
}

impl Enqueued {
    /// The queued entry, whether new or pre-existing.
    #[must_use]
    pub fn entry(&self) -> &QueueEntry {
        match self {
            Enqueued::Accepted(entry) | Enqueued::Duplicate(entry) => entry,
        }
    }
}

/// How the queue disposed of an attempted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The entry is done and will not be attempted again.
    Retired(TerminalKind),
    /// The entry stays queued for another attempt.
    Retry {
        /// Attempts made so far.
        attempts: u32,
        /// Earliest time of the next attempt.
        next_retry_ms: u64,
    },
}

struct QueueInner {
    entries: BTreeMap<u64, QueueEntry>,
    by_fingerprint: HashMap<Fingerprint, u64>,
    next_seq: u64,
    journal: Journal,
}

/// A journaled FIFO of business events awaiting delivery.
pub struct OfflineQueue {
    inner: Mutex<QueueInner>,
    backoff: BackoffPolicy,
}

impl OfflineQueue {
    /// Opens a queue over the given log, replaying any existing journal.
    ///
    /// Entries already retired before the restart are dropped during
    /// replay; only pending work survives.
    ///
    /// # Errors
    ///
    /// Fails on storage errors or a corrupt journal.
    pub fn open(backend: Box<dyn LogBackend>, backoff: BackoffPolicy) -> QueueResult<Self> {
        let mut journal = Journal::new(backend);
        let records = journal.replay()?;

        let mut entries: BTreeMap<u64, QueueEntry> = BTreeMap::new();
        let mut next_seq: u64 = 1;
        for record in records {
            match record {
                JournalRecord::Enqueue(entry) => {
                    next_seq = next_seq.max(entry.seq + 1);
                    entries.insert(entry.seq, entry);
                }
                JournalRecord::Attempt {
                    seq,
                    attempts,
                    at_ms,
                    next_retry_ms,
                } => {
                    if let Some(entry) = entries.get_mut(&seq) {
                        entry.attempts = attempts;
                        entry.last_attempt_ms = Some(at_ms);
                        entry.next_retry_ms = next_retry_ms;
                    }
                }
                JournalRecord::Retire { seq, .. } => {
                    entries.remove(&seq);
                }
                JournalRecord::Snapshot {
                    next_seq: snap_next,
                    entries: snap,
                } => {
                    entries = snap.into_iter().map(|e| (e.seq, e)).collect();
                    next_seq = snap_next;
                }
            }
        }

        let by_fingerprint = entries
            .values()
            .map(|e| (e.fingerprint, e.seq))
            .collect::<HashMap<_, _>>();
        info!(pending = entries.len(), next_seq, "offline queue opened");

        Ok(Self {
            inner: Mutex::new(QueueInner {
                entries,
                by_fingerprint,
                next_seq,
                journal,
            }),
            backoff,
        })
    }

    /// Offers a record for queued delivery.
    ///
    /// A record whose fingerprint matches a pending entry is suppressed
    /// and the existing entry returned, so resubmitting the same unsynced
    /// business content never produces two queue entries.
    ///
    /// # Errors
    ///
    /// Fails if the journal append fails; in that case the queue state is
    /// unchanged.
    pub fn enqueue(&self, record: DomainRecord, now_ms: u64) -> QueueResult<Enqueued> {
        let fingerprint = record.fingerprint();
        let mut inner = self.inner.lock();

        if let Some(&seq) = inner.by_fingerprint.get(&fingerprint) {
            if let Some(existing) = inner.entries.get(&seq) {
                debug!(seq, %fingerprint, "duplicate submission suppressed");
                return Ok(Enqueued::Duplicate(existing.clone()));
            }
        }

        let entry = QueueEntry {
            seq: inner.next_seq,
            record,
            fingerprint,
            enqueued_at_ms: now_ms,
            attempts: 0,
            last_attempt_ms: None,
            next_retry_ms: now_ms,
            terminal: None,
        };
        inner.journal.append(&JournalRecord::Enqueue(entry.clone()))?;
        inner.next_seq += 1;
        inner.by_fingerprint.insert(fingerprint, entry.seq);
        inner.entries.insert(entry.seq, entry.clone());
        debug!(seq = entry.seq, kind = entry.record.kind_name(), "entry queued");
        Ok(Enqueued::Accepted(entry))
    }

    /// Pending entries that may be attempted at `now_ms`, in enqueue order.
    ///
    /// The scan stops at the first entry whose retry window has not yet
    /// opened, even when later entries are past theirs. Replay order is
    /// strict: nothing behind a backed-off entry may jump it.
    #[must_use]
    pub fn next_eligible(&self, now_ms: u64) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .take_while(|e| e.is_eligible(now_ms))
            .cloned()
            .collect()
    }

    /// All pending entries in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        inner.entries.values().cloned().collect()
    }

    /// Number of entries still awaiting delivery.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Records the outcome of one delivery attempt.
    ///
    /// Terminal outcomes retire the entry. A partial acceptance also
    /// retires it, because replaying the envelope would duplicate the
    /// items the engine already took. Transient outcomes increment the
    /// attempt count and push the next try out by the backoff delay.
    ///
    /// # Errors
    ///
    /// Fails if the entry is unknown or the journal append fails.
    pub fn mark_outcome(
        &self,
        seq: u64,
        result: &EngineResult,
        now_ms: u64,
    ) -> QueueResult<Disposition> {
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&seq) {
            return Err(QueueError::UnknownEntry { seq });
        }

        if result.is_terminal() {
            let kind = match result {
                EngineResult::Success(_) => TerminalKind::Succeeded,
                EngineResult::PartialSuccess { .. } => TerminalKind::PartiallyAccepted,
                EngineResult::PermanentFailure(_) => TerminalKind::Rejected,
                EngineResult::TransientFailure(_) => unreachable!("terminal check above"),
            };
            inner.journal.append(&JournalRecord::Retire { seq, kind })?;
            if let Some(entry) = inner.entries.remove(&seq) {
                inner.by_fingerprint.remove(&entry.fingerprint);
            }
            debug!(seq, ?kind, "entry retired");
            return Ok(Disposition::Retired(kind));
        }

        let (attempts, next_retry_ms) = {
            let entry = inner
                .entries
                .get(&seq)
                .ok_or(QueueError::UnknownEntry { seq })?;
            let attempts = entry.attempts + 1;
            let delay = self.backoff.delay_for(attempts);
            (attempts, now_ms + delay.as_millis() as u64)
        };
        inner.journal.append(&JournalRecord::Attempt {
            seq,
            attempts,
            at_ms: now_ms,
            next_retry_ms,
        })?;
        if let Some(entry) = inner.entries.get_mut(&seq) {
            entry.attempts = attempts;
            entry.last_attempt_ms = Some(now_ms);
            entry.next_retry_ms = next_retry_ms;
        }
        debug!(seq, attempts, next_retry_ms, "entry will retry");
        Ok(Disposition::Retry {
            attempts,
            next_retry_ms,
        })
    }

    /// Removes a pending entry without delivering it.
    ///
    /// # Errors
    ///
    /// Fails if no pending entry has the given sequence number.
    pub fn cancel(&self, seq: u64) -> QueueResult<QueueEntry> {
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&seq) {
            return Err(QueueError::UnknownEntry { seq });
        }
        inner.journal.append(&JournalRecord::Retire {
            seq,
            kind: TerminalKind::Cancelled,
        })?;
        let entry = inner
            .entries
            .remove(&seq)
            .ok_or(QueueError::UnknownEntry { seq })?;
        inner.by_fingerprint.remove(&entry.fingerprint);
        info!(seq, kind = entry.record.kind_name(), "entry cancelled");
        Ok(entry)
    }

    /// Compacts the journal down to a single snapshot of live state.
    ///
    /// # Errors
    ///
    /// Fails on storage errors during the rewrite.
    pub fn checkpoint(&self) -> QueueResult<()> {
        let mut inner = self.inner.lock();
        let snapshot = JournalRecord::Snapshot {
            next_seq: inner.next_seq,
            entries: inner.entries.values().cloned().collect(),
        };
        inner.journal.rewrite(&[snapshot])?;
        debug!(pending = inner.entries.len(), "journal checkpointed");
        Ok(())
    }

    /// Forces the journal to durable storage.
    ///
    /// # Errors
    ///
    /// Fails on storage errors.
    pub fn sync(&self) -> QueueResult<()> {
        self.inner.lock().journal.sync()
    }
}
