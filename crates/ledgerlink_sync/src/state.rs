//! Connection state tracking.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where the coordinator believes the engine connection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// The engine is assumed unreachable; submissions queue locally.
    Offline = 0,
    /// A reachability probe is in flight.
    Probing = 1,
    /// The engine answered recently; submissions go direct.
    Online = 2,
}

impl ConnectionState {
    /// Human-readable state name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Offline => "offline",
            ConnectionState::Probing => "probing",
            ConnectionState::Online => "online",
        }
    }

    fn from_byte(b: u8) -> Self {
        match b {
            2 => ConnectionState::Online,
            1 => ConnectionState::Probing,
            _ => ConnectionState::Offline,
        }
    }
}

/// Lock-free connection state shared across threads.
///
/// The probe transition uses compare-and-swap so only one thread runs a
/// probe at a time; everyone else keeps reading the last known state.
#[derive(Debug)]
pub struct ConnectionTracker {
    state: AtomicU8,
}

impl ConnectionTracker {
    /// Starts in the offline state; the first probe promotes it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Offline as u8),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_byte(self.state.load(Ordering::Acquire))
    }

    /// Attempts the offline-to-probing transition. Returns false when the
    /// tracker is already probing or online, in which case the caller must
    /// not run a probe.
    pub fn try_begin_probe(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Offline as u8,
                ConnectionState::Probing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Resolves an in-flight probe.
    pub fn finish_probe(&self, up: bool) {
        let next = if up {
            ConnectionState::Online
        } else {
            ConnectionState::Offline
        };
        self.state.store(next as u8, Ordering::Release);
    }

    /// Records a successful engine exchange.
    pub fn mark_online(&self) {
        self.state
            .store(ConnectionState::Online as u8, Ordering::Release);
    }

    /// Records an engine reachability failure.
    pub fn mark_offline(&self) {
        self.state
            .store(ConnectionState::Offline as u8, Ordering::Release);
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
