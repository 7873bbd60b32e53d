//! Request descriptors and their identity.
//!
//! A [`RequestDescriptor`] is an immutable value describing one logical call:
//! endpoint, verb, optional JSON payload, headers, and per-call policy knobs.
//! Its [`Fingerprint`] — verb + endpoint + canonical payload serialization —
//! is the identity used by both the cache and the request coalescer: two
//! descriptors with equal fingerprints are the same logical request.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

pub mod headers;

pub use headers::Headers;

/// The verb of a logical call.
///
/// Verbs map onto GET/POST/PUT/DELETE semantics at the transport, but the
/// client reasons in terms of intent: only [`Verb::Read`] ever touches the
/// cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Fetch a resource (GET). The only cacheable verb.
    Read,
    /// Create a resource (POST). Not idempotent.
    Create,
    /// Replace a resource (PUT).
    Replace,
    /// Remove a resource (DELETE).
    Remove,
}

impl Verb {
    /// Returns the HTTP method string this verb maps to.
    pub fn as_method(self) -> &'static str {
        match self {
            Self::Read => "GET",
            Self::Create => "POST",
            Self::Replace => "PUT",
            Self::Remove => "DELETE",
        }
    }

    /// Returns `true` if repeating this verb is safe server-side.
    ///
    /// Read, Replace, and Remove are idempotent; Create is not. A verb-aware
    /// [`RetryPolicy`](crate::retry::RetryPolicy) can use this distinction.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Self::Create)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method())
    }
}

/// Deterministic identity of a logical request.
///
/// Derived from verb, endpoint, and the canonical `serde_json` serialization
/// of the payload. Headers and policy knobs are deliberately excluded: two
/// calls that differ only in timeout or loading-UI flags are still the same
/// logical request and share one flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    verb: Verb,
    endpoint: String,
    payload: String,
}

impl Fingerprint {
    /// The endpoint path this fingerprint was derived from.
    ///
    /// Used by [`TtlCache::clear_by_prefix`](crate::cache::TtlCache::clear_by_prefix)
    /// to invalidate a whole resource family.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The verb this fingerprint was derived from.
    pub fn verb(&self) -> Verb {
        self.verb
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb, self.endpoint, self.payload)
    }
}

/// Per-call overrides accepted by the verb helpers on
/// [`Client`](crate::client::Client).
///
/// Every field is optional; `None` falls back to the descriptor default or the
/// client-wide configured value.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use refetch::request::RequestOptions;
///
/// let opts = RequestOptions {
///     timeout: Some(Duration::from_secs(3)),
///     max_retries: Some(1),
///     ..Default::default()
/// };
/// # let _ = opts;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline for each individual attempt.
    pub timeout: Option<Duration>,
    /// Extra attempts after the first (total attempts = `max_retries + 1`).
    pub max_retries: Option<u32>,
    /// Whether to consult/populate the cache. Only meaningful for reads.
    pub use_cache: Option<bool>,
    /// Time-to-live for the cached value, when this call populates the cache.
    pub cache_ttl: Option<Duration>,
    /// Whether to signal the presenter's loading indicator around this call.
    pub show_loading: Option<bool>,
    /// Whether to signal the presenter with a message when this call fails.
    pub show_error: Option<bool>,
    /// Extra headers for this call.
    pub headers: Option<Headers>,
}

/// Immutable description of one logical call.
///
/// Construct with [`RequestDescriptor::new`] and the chained builder methods,
/// or let the verb helpers on [`Client`](crate::client::Client) build one from
/// a [`RequestOptions`].
///
/// # Examples
///
/// ```
/// use refetch::request::{RequestDescriptor, Verb};
/// use serde_json::json;
///
/// let descriptor = RequestDescriptor::new(Verb::Create, "/topics/custom")
///     .payload(json!({ "title": "daily phrases" }))
///     .header("X-Client", "mini-app");
///
/// assert_eq!(descriptor.verb(), Verb::Create);
/// assert!(!descriptor.wants_cache());
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    verb: Verb,
    endpoint: String,
    payload: Option<Value>,
    headers: Headers,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    use_cache: bool,
    cache_ttl: Option<Duration>,
    show_loading: bool,
    show_error: bool,
}

impl RequestDescriptor {
    /// Creates a descriptor for `verb` against `endpoint` with defaults:
    /// no payload, no extra headers, client-wide timeout/retry budget,
    /// caching off, loading and error UI on.
    pub fn new(verb: Verb, endpoint: impl Into<String>) -> Self {
        Self {
            verb,
            endpoint: endpoint.into(),
            payload: None,
            headers: Headers::new(),
            timeout: None,
            max_retries: None,
            use_cache: false,
            cache_ttl: None,
            show_loading: true,
            show_error: true,
        }
    }

    /// Sets the JSON payload (CREATE/REPLACE bodies).
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Appends one header entry.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Overrides the per-attempt deadline for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the retry budget for this call.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Enables or disables cache participation. Only meaningful for reads.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Overrides the TTL applied when this call populates the cache.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Enables or disables the loading-indicator side effect.
    pub fn show_loading(mut self, show: bool) -> Self {
        self.show_loading = show;
        self
    }

    /// Enables or disables the error-toast side effect.
    pub fn show_error(mut self, show: bool) -> Self {
        self.show_error = show;
        self
    }

    /// Merges a caller-supplied [`RequestOptions`] into this descriptor.
    /// Fields left `None` keep the descriptor's current value.
    pub fn apply(mut self, options: RequestOptions) -> Self {
        if let Some(timeout) = options.timeout {
            self.timeout = Some(timeout);
        }
        if let Some(max_retries) = options.max_retries {
            self.max_retries = Some(max_retries);
        }
        if let Some(use_cache) = options.use_cache {
            self.use_cache = use_cache;
        }
        if let Some(ttl) = options.cache_ttl {
            self.cache_ttl = Some(ttl);
        }
        if let Some(show) = options.show_loading {
            self.show_loading = show;
        }
        if let Some(show) = options.show_error {
            self.show_error = show;
        }
        if let Some(extra) = options.headers {
            // Per-call headers replace same-named descriptor defaults rather
            // than piling up duplicates.
            for (name, _) in extra.iter() {
                self.headers.remove(name);
            }
            for (name, value) in extra.iter() {
                self.headers.insert(name, value);
            }
        }
        self
    }

    /// Computes the deterministic [`Fingerprint`] of this descriptor.
    ///
    /// The payload is serialized with `serde_json`, which is deterministic for
    /// a given `Value`; an absent payload serializes to the empty string so it
    /// is distinct from an explicit JSON `null`.
    pub fn fingerprint(&self) -> Fingerprint {
        let payload = match &self.payload {
            // Serializing an in-memory Value cannot fail.
            Some(value) => value.to_string(),
            None => String::new(),
        };
        Fingerprint {
            verb: self.verb,
            endpoint: self.endpoint.clone(),
            payload,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// The verb of this call.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The endpoint path (host-relative).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The JSON payload, if any.
    pub fn payload_value(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// The headers attached so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The per-attempt deadline override, if any.
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// The retry-budget override, if any.
    pub fn max_retries_override(&self) -> Option<u32> {
        self.max_retries
    }

    /// Whether this call participates in the cache.
    pub fn wants_cache(&self) -> bool {
        self.use_cache
    }

    /// The cache-TTL override, if any.
    pub fn cache_ttl_override(&self) -> Option<Duration> {
        self.cache_ttl
    }

    /// Whether the loading indicator should be signalled around this call.
    pub fn wants_loading_ui(&self) -> bool {
        self.show_loading
    }

    /// Whether a failure should be signalled to the presenter.
    pub fn wants_error_ui(&self) -> bool {
        self.show_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Verb ──────────────────────────────────────────────────────────────────

    #[test]
    fn verb_method_mapping() {
        assert_eq!(Verb::Read.as_method(), "GET");
        assert_eq!(Verb::Create.as_method(), "POST");
        assert_eq!(Verb::Replace.as_method(), "PUT");
        assert_eq!(Verb::Remove.as_method(), "DELETE");
    }

    #[test]
    fn only_create_is_non_idempotent() {
        assert!(Verb::Read.is_idempotent());
        assert!(Verb::Replace.is_idempotent());
        assert!(Verb::Remove.is_idempotent());
        assert!(!Verb::Create.is_idempotent());
    }

    // ── Fingerprint ───────────────────────────────────────────────────────────

    #[test]
    fn fingerprint_is_deterministic() {
        let a = RequestDescriptor::new(Verb::Read, "/topics")
            .payload(json!({ "page": 1, "size": 20 }));
        let b = RequestDescriptor::new(Verb::Read, "/topics")
            .payload(json!({ "page": 1, "size": 20 }));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_by_verb() {
        let read = RequestDescriptor::new(Verb::Read, "/topics");
        let remove = RequestDescriptor::new(Verb::Remove, "/topics");
        assert_ne!(read.fingerprint(), remove.fingerprint());
    }

    #[test]
    fn fingerprint_differs_by_endpoint() {
        let a = RequestDescriptor::new(Verb::Read, "/topics");
        let b = RequestDescriptor::new(Verb::Read, "/lessons");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_by_payload() {
        let a = RequestDescriptor::new(Verb::Create, "/topics").payload(json!({ "t": 1 }));
        let b = RequestDescriptor::new(Verb::Create, "/topics").payload(json!({ "t": 2 }));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_headers_and_policy_knobs() {
        let plain = RequestDescriptor::new(Verb::Read, "/topics");
        let decorated = RequestDescriptor::new(Verb::Read, "/topics")
            .header("X-Trace", "abc")
            .timeout(Duration::from_secs(1))
            .max_retries(9)
            .show_loading(false);
        assert_eq!(plain.fingerprint(), decorated.fingerprint());
    }

    #[test]
    fn absent_payload_differs_from_null_payload() {
        let absent = RequestDescriptor::new(Verb::Create, "/topics");
        let null = RequestDescriptor::new(Verb::Create, "/topics").payload(json!(null));
        assert_ne!(absent.fingerprint(), null.fingerprint());
    }

    #[test]
    fn fingerprint_exposes_endpoint() {
        let fp = RequestDescriptor::new(Verb::Read, "/topics/42").fingerprint();
        assert_eq!(fp.endpoint(), "/topics/42");
        assert_eq!(fp.verb(), Verb::Read);
    }

    // ── Options merge ─────────────────────────────────────────────────────────

    #[test]
    fn apply_overrides_only_provided_fields() {
        let descriptor = RequestDescriptor::new(Verb::Read, "/topics")
            .use_cache(true)
            .apply(RequestOptions {
                timeout: Some(Duration::from_millis(750)),
                show_loading: Some(false),
                ..Default::default()
            });

        assert_eq!(descriptor.timeout_override(), Some(Duration::from_millis(750)));
        assert!(!descriptor.wants_loading_ui());
        // Untouched fields keep their values.
        assert!(descriptor.wants_cache());
        assert!(descriptor.wants_error_ui());
        assert_eq!(descriptor.max_retries_override(), None);
    }

    #[test]
    fn apply_merges_extra_headers() {
        let mut extra = Headers::new();
        extra.insert("X-Client", "mini-app");

        let descriptor = RequestDescriptor::new(Verb::Read, "/topics")
            .header("Accept", "application/json")
            .apply(RequestOptions {
                headers: Some(extra),
                ..Default::default()
            });

        assert_eq!(descriptor.headers().get("accept"), Some("application/json"));
        assert_eq!(descriptor.headers().get("x-client"), Some("mini-app"));
    }

    #[test]
    fn apply_replaces_same_named_headers() {
        let mut extra = Headers::new();
        extra.insert("X-Client", "per-call");

        let descriptor = RequestDescriptor::new(Verb::Read, "/topics")
            .header("X-Client", "default")
            .apply(RequestOptions {
                headers: Some(extra),
                ..Default::default()
            });

        assert_eq!(descriptor.headers().get("x-client"), Some("per-call"));
        assert_eq!(descriptor.headers().len(), 1);
    }
}
