//! Append-only journal backing the queue.
//!
//! Every mutation of queue state is framed and appended before the
//! in-memory view changes, so a crash at any point replays to the same
//! state. Frame layout: magic (4) + version (2) + type (1) + length (4,
//! LE) + CBOR payload + CRC32 (4, LE, over everything before it).

use crate::entry::{QueueEntry, TerminalKind};
use crate::error::{QueueError, QueueResult};
use ledgerlink_storage::LogBackend;
use serde::{Deserialize, Serialize};

/// Magic bytes identifying a journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"LLQJ";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_SIZE: usize = 11;
const CRC_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FrameType {
    Enqueue = 1,
    Attempt = 2,
    Retire = 3,
    Snapshot = 4,
}

impl FrameType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Enqueue),
            2 => Some(Self::Attempt),
            3 => Some(Self::Retire),
            4 => Some(Self::Snapshot),
            _ => None,
        }
    }
}

/// One journaled state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum JournalRecord {
    /// A new entry entered the queue.
    Enqueue(QueueEntry),
    /// A delivery attempt failed transiently.
    Attempt {
        /// Entry being attempted.
        seq: u64,
        /// New attempt count.
        attempts: u32,
        /// When the attempt ran.
        at_ms: u64,
        /// Earliest time for the next attempt.
        next_retry_ms: u64,
    },
    /// An entry left the pending set.
    Retire {
        /// Entry being retired.
        seq: u64,
        /// Why it was retired.
        kind: TerminalKind,
    },
    /// A compaction point: full live state, replacing all prior frames.
    Snapshot {
        /// Next sequence number to hand out.
        next_seq: u64,
        /// All live entries at the compaction point.
        entries: Vec<QueueEntry>,
    },
}

impl JournalRecord {
    fn frame_type(&self) -> FrameType {
        match self {
            Self::Enqueue(_) => FrameType::Enqueue,
            Self::Attempt { .. } => FrameType::Attempt,
            Self::Retire { .. } => FrameType::Retire,
            Self::Snapshot { .. } => FrameType::Snapshot,
        }
    }
}

/// The queue's durable log of state changes.
pub(crate) struct Journal {
    backend: Box<dyn LogBackend>,
}

impl Journal {
    pub(crate) fn new(backend: Box<dyn LogBackend>) -> Self {
        Self { backend }
    }

    /// Appends one frame and flushes it to the backend.
    pub(crate) fn append(&mut self, record: &JournalRecord) -> QueueResult<()> {
        let mut payload = Vec::new();
        ciborium::into_writer(record, &mut payload)
            .map_err(|e| QueueError::Encode(e.to_string()))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        frame.push(record.frame_type() as u8);
        let len = u32::try_from(payload.len())
            .map_err(|_| QueueError::Encode("journal payload too large".into()))?;
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        self.backend.append(&frame)?;
        self.backend.flush()?;
        Ok(())
    }

    /// Reads every valid frame from the start of the log.
    ///
    /// A truncated final frame marks the end of the journal (an append cut
    /// short by a crash) and is not an error. A frame with bad magic, an
    /// unknown type, or a CRC mismatch is corruption.
    pub(crate) fn replay(&mut self) -> QueueResult<Vec<JournalRecord>> {
        let total = self.backend.size()?;
        let mut records = Vec::new();
        let mut offset = 0u64;

        while offset + (HEADER_SIZE as u64) <= total {
            let header = self.backend.read_at(offset, HEADER_SIZE)?;
            if header[0..4] != JOURNAL_MAGIC {
                return Err(QueueError::CorruptJournal {
                    offset,
                    detail: "bad magic".into(),
                });
            }
            let version = u16::from_le_bytes([header[4], header[5]]);
            if version != JOURNAL_VERSION {
                return Err(QueueError::CorruptJournal {
                    offset,
                    detail: format!("unsupported version {version}"),
                });
            }
            let frame_type = FrameType::from_byte(header[6]).ok_or_else(|| {
                QueueError::CorruptJournal {
                    offset,
                    detail: format!("unknown frame type {}", header[6]),
                }
            })?;
            let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

            let frame_size = HEADER_SIZE + len + CRC_SIZE;
            if offset + (frame_size as u64) > total {
                // Torn final append; everything before it is intact.
                break;
            }
            let frame = self.backend.read_at(offset, frame_size)?;
            let stored_crc = u32::from_le_bytes([
                frame[frame_size - 4],
                frame[frame_size - 3],
                frame[frame_size - 2],
                frame[frame_size - 1],
            ]);
            let computed = compute_crc32(&frame[..frame_size - CRC_SIZE]);
            if stored_crc != computed {
                return Err(QueueError::CorruptJournal {
                    offset,
                    detail: "crc mismatch".into(),
                });
            }

            let payload = &frame[HEADER_SIZE..frame_size - CRC_SIZE];
            let record: JournalRecord =
                ciborium::from_reader(payload).map_err(|e| QueueError::CorruptJournal {
                    offset,
                    detail: e.to_string(),
                })?;
            if record.frame_type() != frame_type {
                return Err(QueueError::CorruptJournal {
                    offset,
                    detail: "frame type does not match payload".into(),
                });
            }
            records.push(record);
            offset += frame_size as u64;
        }
        Ok(records)
    }

    /// Replaces the whole journal with the given frames and syncs.
    pub(crate) fn rewrite(&mut self, records: &[JournalRecord]) -> QueueResult<()> {
        self.backend.truncate(0)?;
        for record in records {
            self.append(record)?;
        }
        self.backend.sync()?;
        Ok(())
    }

    /// Forces journal contents to durable storage.
    pub(crate) fn sync(&mut self) -> QueueResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}

/// CRC32 (IEEE polynomial) with a compile-time table.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
