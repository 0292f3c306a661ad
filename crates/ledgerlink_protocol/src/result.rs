//! The shared result model for engine interactions.
//!
//! Every transport or parse attempt produces exactly one [`EngineResult`];
//! there is no silent-drop path. The four variants form a closed set that
//! callers match exhaustively.

use crate::report::ReportData;
use std::fmt;

/// The outcome of one attempt to reach the engine with one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResult {
    /// The engine accepted everything it was sent.
    Success(Acceptance),
    /// The engine accepted some items and rejected others.
    PartialSuccess {
        /// Number of items the engine created or altered.
        accepted: u32,
        /// One entry per rejected item, engine text preserved.
        errors: Vec<ItemError>,
    },
    /// The attempt failed in a way that is expected to recover: the engine
    /// was unreachable, busy, or returned an unusable body.
    TransientFailure(TransientReason),
    /// The engine understood the request and rejected it.
    PermanentFailure(EngineRejection),
}

impl EngineResult {
    /// True for a full acceptance.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, EngineResult::Success(_))
    }

    /// True if retrying the same envelope could change the outcome.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineResult::TransientFailure(_))
    }

    /// True if the attempt reached the engine and produced a final answer,
    /// so a queued entry for it must be retired rather than retried.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_transient()
    }
}

/// Details of a successful engine interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Acceptance {
    /// Objects the engine created.
    pub created: u32,
    /// Objects the engine altered.
    pub altered: u32,
    /// The engine's reference for the last created object, when reported.
    pub reference: Option<String>,
    /// Decoded report payload, for export queries.
    pub report: Option<ReportData>,
}

impl Acceptance {
    /// An import acceptance.
    #[must_use]
    pub fn imported(created: u32, altered: u32, reference: Option<String>) -> Self {
        Self {
            created,
            altered,
            reference,
            report: None,
        }
    }

    /// An export acceptance carrying decoded report rows.
    #[must_use]
    pub fn report(data: ReportData) -> Self {
        Self {
            created: 0,
            altered: 0,
            reference: None,
            report: Some(data),
        }
    }
}

/// The engine's description of one rejected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Engine error text, verbatim.
    pub message: String,
}

impl ItemError {
    /// Wraps an engine error line.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why an attempt is classified as recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientReason {
    /// The engine returned nothing at all.
    EmptyResponse,
    /// The body could not be parsed as XML. The engine truncates bodies
    /// under load, so this is treated as recoverable rather than fatal.
    MalformedResponse(String),
    /// Well-formed XML that matched no known response shape.
    UnrecognizedResponse,
    /// The engine host could not be reached before the timeout.
    Unreachable(String),
    /// The engine host answered but refused the exchange.
    Refused(String),
    /// The submission was accepted into the offline queue and will be
    /// replayed once connectivity returns.
    QueuedOffline,
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientReason::EmptyResponse => write!(f, "no response from engine"),
            TransientReason::MalformedResponse(detail) => {
                write!(f, "malformed engine response: {detail}")
            }
            TransientReason::UnrecognizedResponse => write!(f, "unrecognized engine response"),
            TransientReason::Unreachable(detail) => write!(f, "engine unreachable: {detail}"),
            TransientReason::Refused(detail) => write!(f, "engine refused request: {detail}"),
            TransientReason::QueuedOffline => write!(f, "accepted, pending sync"),
        }
    }
}

/// A definitive rejection from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRejection {
    /// The engine's own error text, verbatim, for diagnostics.
    pub message: String,
    /// Engine error code, when the response carried one.
    pub code: Option<i64>,
}

impl fmt::Display for EngineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "engine rejected request (code {code}): {}", self.message),
            None => write!(f, "engine rejected request: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(EngineResult::Success(Acceptance::imported(1, 0, None)).is_terminal());
        assert!(EngineResult::PermanentFailure(EngineRejection {
            message: "bad ledger".into(),
            code: None,
        })
        .is_terminal());
        assert!(EngineResult::PartialSuccess {
            accepted: 1,
            errors: vec![ItemError::new("line 2 rejected")],
        }
        .is_terminal());
        assert!(!EngineResult::TransientFailure(TransientReason::EmptyResponse).is_terminal());
    }

    #[test]
    fn transient_reason_display() {
        assert_eq!(
            TransientReason::QueuedOffline.to_string(),
            "accepted, pending sync"
        );
        assert!(TransientReason::Unreachable("connect timed out".into())
            .to_string()
            .contains("connect timed out"));
    }
}
