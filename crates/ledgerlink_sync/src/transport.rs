//! Transport abstraction between the coordinator and the engine.

use ledgerlink_protocol::{EngineEnvelope, TransientReason};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A transport-level failure. Always recoverable: the envelope never
/// reached a decodable engine response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The engine host did not answer within the timeout.
    Unreachable(String),
    /// The engine host answered but refused the exchange.
    Refused(String),
}

impl TransportError {
    /// The matching result-model reason for this failure.
    #[must_use]
    pub fn reason(&self) -> TransientReason {
        match self {
            TransportError::Unreachable(detail) => TransientReason::Unreachable(detail.clone()),
            TransportError::Refused(detail) => TransientReason::Refused(detail.clone()),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unreachable(detail) => write!(f, "unreachable: {detail}"),
            TransportError::Refused(detail) => write!(f, "refused: {detail}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Carries envelopes to the engine and returns raw response bodies.
///
/// Implementations must not interpret the response; classification is the
/// decoder's job.
pub trait EngineTransport: Send + Sync {
    /// Delivers one envelope and returns the raw response body.
    fn send(&self, envelope: &EngineEnvelope, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Cheap reachability check; must not mutate engine state.
    fn ping(&self, timeout: Duration) -> bool;
}

/// Scripted in-memory transport for tests.
///
/// Responses are popped front-to-back; when the script runs dry a plain
/// single-create import acceptance is returned. Every sent envelope is
/// recorded for inspection.
#[derive(Default)]
pub struct MockTransport {
    up: AtomicBool,
    responses: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    sent: Mutex<Vec<EngineEnvelope>>,
}

impl MockTransport {
    /// Creates a mock transport that is up.
    #[must_use]
    pub fn new() -> Self {
        Self {
            up: AtomicBool::new(true),
            responses: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock transport that is down.
    #[must_use]
    pub fn down() -> Self {
        let transport = Self::new();
        transport.set_up(false);
        transport
    }

    /// Raises or cuts the simulated link.
    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    /// Queues a scripted response body.
    pub fn push_response(&self, body: impl Into<Vec<u8>>) {
        self.responses.lock().push_back(Ok(body.into()));
    }

    /// Queues a scripted transport failure.
    pub fn push_failure(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Envelopes sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<EngineEnvelope> {
        self.sent.lock().clone()
    }

    /// Number of envelopes sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl EngineTransport for MockTransport {
    fn send(
        &self,
        envelope: &EngineEnvelope,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("mock transport is down".into()));
        }
        self.sent.lock().push(envelope.clone());
        match self.responses.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(
                b"<ENVELOPE><CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>0</ERRORS></ENVELOPE>"
                    .to_vec(),
            ),
        }
    }

    fn ping(&self, _timeout: Duration) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_protocol::ResponseShape;

    fn envelope() -> EngineEnvelope {
        EngineEnvelope {
            shape: ResponseShape::Import,
            xml: "<ENVELOPE></ENVELOPE>".into(),
        }
    }

    #[test]
    fn down_transport_fails_without_recording() {
        let transport = MockTransport::down();
        assert!(!transport.ping(Duration::from_secs(1)));
        let result = transport.send(&envelope(), Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::Unreachable(_))));
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn scripted_responses_pop_in_order() {
        let transport = MockTransport::new();
        transport.push_response(b"first".to_vec());
        transport.push_failure(TransportError::Refused("busy".into()));
        assert_eq!(
            transport.send(&envelope(), Duration::from_secs(1)).unwrap(),
            b"first"
        );
        assert!(matches!(
            transport.send(&envelope(), Duration::from_secs(1)),
            Err(TransportError::Refused(_))
        ));
        // Script exhausted: default acceptance.
        let body = transport.send(&envelope(), Duration::from_secs(1)).unwrap();
        assert!(String::from_utf8_lossy(&body).contains("<CREATED>1</CREATED>"));
    }
}
