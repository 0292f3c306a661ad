//! Sync coordination between local callers and a ledger engine.
//!
//! Tracks engine reachability, routes submissions between direct delivery
//! and the offline queue, and replays queued work in order once the
//! engine comes back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod http;
mod scheduler;
mod state;
mod transport;

pub use config::SyncConfig;
pub use coordinator::{DrainHalt, DrainReport, SyncCoordinator, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpTransport, ReqwestClient};
pub use scheduler::SyncScheduler;
pub use state::{ConnectionState, ConnectionTracker};
pub use transport::{EngineTransport, MockTransport, TransportError};
