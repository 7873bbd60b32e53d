//! The error taxonomy every failed request resolves to.
//!
//! Every failure a caller can observe is an [`ApiError`] carrying its kind and
//! an underlying message. The presentation layer never needs kind-specific
//! logic: [`ApiError::user_message`] maps each kind to a short human-readable
//! string suitable for a toast.

use std::time::Duration;

use thiserror::Error;

/// A failed request, classified by what went wrong.
///
/// `Timeout`, `Transport`, and `Decode` failures are eligible for retry (see
/// [`RetryPolicy`](crate::retry::RetryPolicy)); `NetworkUnavailable` is a
/// local short-circuit raised before any exchange is attempted and is never
/// retried.
///
/// The enum is `Clone` so a single coalesced failure can be delivered to every
/// waiter sharing the flight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The device reported no connectivity; no exchange was attempted.
    #[error("device is offline")]
    NetworkUnavailable,

    /// A single attempt exceeded its deadline.
    #[error("attempt exceeded its {limit:?} deadline")]
    Timeout {
        /// The deadline that elapsed.
        limit: Duration,
    },

    /// The exchange failed at the transport level: a connection error
    /// (`status: None`) or a non-2xx response (`status: Some(..)`).
    #[error("transport failure{}: {message}", status_suffix(.status))]
    Transport {
        /// HTTP status code, when a response was received at all.
        status: Option<u16>,
        /// Underlying transport detail; not shown to end users.
        message: String,
    },

    /// The response body was not valid for the expected envelope shape.
    #[error("could not decode response: {message}")]
    Decode {
        /// Underlying decode detail; not shown to end users.
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl ApiError {
    /// Builds a [`ApiError::Transport`] for a connection-level failure with no
    /// HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Builds a [`ApiError::Transport`] for a non-success HTTP status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds a [`ApiError::Decode`] from any display-able decode failure.
    pub fn decode(source: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: source.to_string(),
        }
    }

    /// Returns `true` for a transport failure whose status is in the 4xx
    /// range, i.e. a client error the server will keep rejecting.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Transport { status: Some(code), .. } if (400..500).contains(code))
    }

    /// A short, stable, human-readable message for this error kind.
    ///
    /// This is what the orchestrator hands to
    /// [`Presenter::show_error`](crate::platform::Presenter::show_error); raw
    /// transport text is deliberately not exposed to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable => "network unavailable",
            Self::Timeout { .. } => "request timed out",
            Self::Transport { .. } => "request failed",
            Self::Decode { .. } => "unexpected server response",
        }
    }
}
