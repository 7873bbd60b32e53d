//! Platform collaborator seams: connectivity, credentials, presentation.
//!
//! These traits describe what the client needs from the host application, not
//! how the host provides it. All three have no-op defaults so a
//! [`ClientBuilder`](crate::client::ClientBuilder) works out of the box; real
//! deployments inject the device's connectivity API, token storage, and
//! loading/toast UI.

/// Point-in-time device connectivity query.
///
/// Consulted once per logical call, before anything else happens. When it
/// reports offline the call fails immediately with
/// [`ApiError::NetworkUnavailable`](crate::error::ApiError::NetworkUnavailable)
/// — no exchange, no retry attempt consumed.
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `true` if the device currently reports connectivity.
    fn is_online(&self) -> bool;
}

/// Access to the persisted session token.
///
/// When a token is present the client attaches `Authorization: Bearer <token>`
/// to the exchange, unless the caller already set that header. Refresh logic
/// lives outside the client.
pub trait CredentialStore: Send + Sync {
    /// Returns the current session token, if one is stored.
    fn token(&self) -> Option<String>;
}

/// Fire-and-forget presentation signals.
///
/// The client never awaits these and never depends on their effect; they are
/// a side channel parallel to the returned `Result`. Callers must still
/// handle the error the client returns even when a toast was shown.
pub trait Presenter: Send + Sync {
    /// Shows or hides a loading indicator.
    fn show_loading(&self, visible: bool);

    /// Shows a short human-readable failure message.
    fn show_error(&self, message: &str);
}

/// Probe that always reports connectivity. The builder default.
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Credential store with no stored token. The builder default.
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Presenter that drops every signal. The builder default.
pub struct SilentPresenter;

impl Presenter for SilentPresenter {
    fn show_loading(&self, _visible: bool) {}

    fn show_error(&self, _message: &str) {}
}
