//! CLI command implementations.

pub mod cancel;
pub mod checkpoint;
pub mod drain;
pub mod pending;
pub mod probe;
pub mod status;
