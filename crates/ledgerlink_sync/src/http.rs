//! HTTP transport to a real engine endpoint.
//!
//! The engine listens on a plain HTTP port and takes envelopes as the
//! body of a POST to its root path. The HTTP client itself sits behind a
//! trait so tests and embedders can swap the implementation.

use crate::transport::{EngineTransport, TransportError};
use ledgerlink_protocol::EngineEnvelope;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// POSTs an XML body and returns the raw response body.
    fn post_xml(
        &self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// [`HttpClient`] backed by a blocking reqwest client.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds the underlying client.
    ///
    /// # Errors
    ///
    /// Fails if the system TLS or resolver configuration is unusable.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post_xml(
        &self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body.to_vec())
            .send()
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Refused(format!("HTTP {status}")));
        }
        let bytes = response.bytes().map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() {
        TransportError::Unreachable(err.to_string())
    } else {
        TransportError::Refused(err.to_string())
    }
}

/// Engine transport over HTTP.
pub struct HttpTransport<C: HttpClient> {
    host: String,
    port: u16,
    client: C,
}

impl HttpTransport<ReqwestClient> {
    /// Connects to an engine endpoint with the default client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self, TransportError> {
        Ok(Self::with_client(host, port, ReqwestClient::new()?))
    }
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport over a caller-supplied client.
    pub fn with_client(host: impl Into<String>, port: u16, client: C) -> Self {
        Self {
            host: host.into(),
            port,
            client,
        }
    }

    /// The engine endpoint URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl<C: HttpClient> EngineTransport for HttpTransport<C> {
    fn send(
        &self,
        envelope: &EngineEnvelope,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        debug!(url = %self.url(), bytes = envelope.xml.len(), "sending envelope");
        self.client.post_xml(&self.url(), envelope.as_bytes(), timeout)
    }

    fn ping(&self, timeout: Duration) -> bool {
        // A raw TCP connect is enough to tell whether the engine port is
        // listening, without pushing an envelope at it.
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(_) => return false,
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, timeout).is_ok() {
                return true;
            }
        }
        false
    }
}
