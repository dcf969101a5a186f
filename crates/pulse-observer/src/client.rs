//! Minimal HTTP/1 client instrumented with a `PulseObserver`.
//!
//! Opens one connection per request (plain TCP + hyper handshake), which
//! is enough for probing and prefetching against a single origin.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use tracing::debug;

use pulse_core::{PURPOSE_HEADER, RequestPurpose, StrategyTier};

use crate::error::{ClientError, ClientResult};
use crate::observer::PulseObserver;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a `PulseClient::prefetch` call.
#[derive(Debug)]
pub enum PrefetchOutcome {
    /// The server answered the prefetch.
    Fetched(Response<Bytes>),
    /// The server turned the prefetch away with 503.
    Rejected(Response<Bytes>),
    /// The observed strategy forbade prefetching; nothing was sent.
    Skipped(StrategyTier),
}

impl PrefetchOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, PrefetchOutcome::Fetched(_))
    }
}

/// HTTP client bound to one origin, learning its pulse as it goes.
#[derive(Debug, Clone)]
pub struct PulseClient {
    address: String,
    timeout: Duration,
    observer: PulseObserver,
}

impl PulseClient {
    /// Create a client for `address` (`host:port`).
    pub fn new(address: impl Into<String>, observer: PulseObserver) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            observer,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn observer(&self) -> &PulseObserver {
        &self.observer
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Normal-priority GET.
    pub async fn get(&self, path: &str) -> ClientResult<Response<Bytes>> {
        self.send(path, RequestPurpose::Normal).await
    }

    /// Speculative GET, tagged `x-purpose: prefetch`.
    ///
    /// Consults the observer first and sends nothing while blocked.
    pub async fn prefetch(&self, path: &str) -> ClientResult<PrefetchOutcome> {
        let strategy = self.observer.current_strategy();
        if !strategy.allows_prefetch() {
            debug!(%path, %strategy, "prefetch skipped");
            return Ok(PrefetchOutcome::Skipped(strategy));
        }

        let response = self.send(path, RequestPurpose::Prefetch).await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            debug!(%path, "prefetch rejected by server");
            Ok(PrefetchOutcome::Rejected(response))
        } else {
            Ok(PrefetchOutcome::Fetched(response))
        }
    }

    async fn send(&self, path: &str, purpose: RequestPurpose) -> ClientResult<Response<Bytes>> {
        self.observer.intercept(self.perform(path, purpose)).await
    }

    async fn perform(&self, path: &str, purpose: RequestPurpose) -> ClientResult<Response<Bytes>> {
        let exchange = async {
            let stream = tokio::net::TcpStream::connect(&self.address)
                .await
                .map_err(ClientError::Connect)?;

            let io = TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(ClientError::Handshake)?;

            // Drive the connection in the background.
            let address = self.address.clone();
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, %address, "pulse client connection closed with error");
                }
            });

            let mut builder = Request::builder()
                .method(Method::GET)
                .uri(path)
                .header(HOST, self.address.as_str())
                .header(USER_AGENT, "pulse-fetch/0.1");
            if let Some(tag) = purpose.header_value() {
                builder = builder.header(PURPOSE_HEADER, tag);
            }
            let req = builder.body(Empty::<Bytes>::new())?;

            let resp = sender.send_request(req).await.map_err(ClientError::Request)?;
            let (parts, body) = resp.into_parts();
            let body = body.collect().await.map_err(ClientError::Body)?.to_bytes();
            Ok::<_, ClientError>(Response::from_parts(parts, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(address = %self.address, %path, "pulse client request timed out");
                Err(ClientError::Timeout(self.timeout))
            }
        }
    }
}
