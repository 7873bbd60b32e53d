//! The transport collaborator seam.
//!
//! The client never talks to a socket itself; it hands a fully-prepared
//! [`ExchangeRequest`] to an injected [`Transport`] and gets back a
//! [`RawResponse`] (status + body bytes) or a [`TransportError`]. A real
//! deployment backs this with the platform's HTTP stack; tests back it with
//! closures or counting mocks.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::request::{Headers, Verb};

/// One fully-prepared physical request: endpoint, verb, headers (including
/// any attached authorization), and the serialized JSON body.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Host-relative endpoint path.
    pub endpoint: String,
    /// The verb, mapped to an HTTP method via [`Verb::as_method`].
    pub verb: Verb,
    /// Headers to send.
    pub headers: Headers,
    /// Serialized JSON body, when the call carries a payload.
    pub body: Option<Bytes>,
}

/// The raw result of one exchange: HTTP status and unparsed body bytes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Bytes,
}

/// A connection-level failure reported by the transport (DNS, refused
/// connection, reset mid-body). Status-bearing failures are *not* errors at
/// this layer — the transport returns the [`RawResponse`] and the client
/// classifies non-2xx statuses itself.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Underlying transport detail.
    pub message: String,
}

impl TransportError {
    /// Builds a transport error from any display-able source.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Boxed future returned by [`Transport::exchange`].
pub type ExchangeFuture = Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send>>;

/// The single request/response exchange collaborator.
///
/// Implementations **must** be `Send + Sync`: one transport instance is
/// shared across every concurrent call the client runs. The returned future
/// may be dropped before completion when an attempt's deadline elapses —
/// dropping is the cancellation hook, so implementations that can abort the
/// underlying I/O should do so in their drop path.
///
/// Any `Fn(ExchangeRequest) -> ExchangeFuture` closure implements `Transport`
/// via the blanket impl below, which keeps test doubles terse:
///
/// ```
/// use bytes::Bytes;
/// use refetch::transport::{ExchangeFuture, ExchangeRequest, RawResponse, Transport};
///
/// let transport = |request: ExchangeRequest| -> ExchangeFuture {
///     Box::pin(async move {
///         let _ = request;
///         Ok(RawResponse {
///             status: 200,
///             body: Bytes::from_static(br#"{"code":0,"message":"ok","data":null}"#),
///         })
///     })
/// };
/// let _: &dyn Transport = &transport;
/// ```
pub trait Transport: Send + Sync {
    /// Performs one physical exchange.
    fn exchange(&self, request: ExchangeRequest) -> ExchangeFuture;
}

impl<F> Transport for F
where
    F: Fn(ExchangeRequest) -> ExchangeFuture + Send + Sync,
{
    fn exchange(&self, request: ExchangeRequest) -> ExchangeFuture {
        (self)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closures_implement_transport() {
        let transport = |request: ExchangeRequest| -> ExchangeFuture {
            Box::pin(async move {
                assert_eq!(request.verb, Verb::Read);
                Ok(RawResponse {
                    status: 204,
                    body: Bytes::new(),
                })
            })
        };

        let request = ExchangeRequest {
            endpoint: "/ping".to_string(),
            verb: Verb::Read,
            headers: Headers::new(),
            body: None,
        };
        let response = Transport::exchange(&transport, request).await.unwrap();
        assert_eq!(response.status, 204);
    }
}
