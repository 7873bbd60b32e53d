//! The request client every screen funnels its network calls through.
//!
//! [`Client`] composes the resilience pieces into one pipeline:
//!
//! ```text
//! caller → network gate → cache (reads only)
//!        → coalescer( retry( deadline( exchange ) ) )
//!        → cache store on success → caller
//! ```
//!
//! Collaborators — transport, connectivity probe, credential store, presenter,
//! retry policy — are all constructor-injected trait objects, so tests and
//! independent clients never share hidden global state. Presentation signals
//! are fire-and-forget and run parallel to the returned `Result`; callers
//! always receive the typed error even when a toast was shown.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{TtlCache, spawn_sweeper};
use crate::coalesce::RequestCoalescer;
use crate::error::ApiError;
use crate::platform::{
    AlwaysOnline, ConnectivityProbe, CredentialStore, NoCredentials, Presenter, SilentPresenter,
};
use crate::request::{Fingerprint, RequestDescriptor, RequestOptions, Verb};
use crate::response::ApiResponse;
use crate::retry::{Backoff, RetryAll, RetryPolicy, run_with_retry};
use crate::timeout::with_deadline;
use crate::transport::{ExchangeRequest, Transport};

/// Per-attempt deadline applied when neither the call nor the builder sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry budget applied when neither the call nor the builder sets one.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// TTL applied to cached reads unless overridden per call.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// How often the background sweep evicts expired cache entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Builder for [`Client`]. Only the transport is mandatory; every other
/// collaborator has a no-op default.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use refetch::client::ClientBuilder;
/// use refetch::transport::{ExchangeFuture, ExchangeRequest, RawResponse};
///
/// # async fn example() {
/// let client = ClientBuilder::new(|_req: ExchangeRequest| -> ExchangeFuture {
///     Box::pin(async {
///         Ok(RawResponse {
///             status: 200,
///             body: Bytes::from_static(br#"{"code":0,"message":"ok","data":[]}"#),
///         })
///     })
/// })
/// .build();
/// # let _ = client;
/// # }
/// ```
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ConnectivityProbe>,
    credentials: Arc<dyn CredentialStore>,
    presenter: Arc<dyn Presenter>,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff: Backoff,
    default_timeout: Duration,
    default_max_retries: u32,
    cache_ttl: Duration,
    sweep_interval: Duration,
}

impl ClientBuilder {
    /// Starts a builder around the given transport.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            probe: Arc::new(AlwaysOnline),
            credentials: Arc::new(NoCredentials),
            presenter: Arc::new(SilentPresenter),
            retry_policy: Arc::new(RetryAll),
            backoff: Backoff::default(),
            default_timeout: DEFAULT_TIMEOUT,
            default_max_retries: DEFAULT_MAX_RETRIES,
            cache_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Injects the device connectivity probe.
    pub fn probe(mut self, probe: impl ConnectivityProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Injects the credential store consulted for the authorization header.
    pub fn credentials(mut self, credentials: impl CredentialStore + 'static) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Injects the loading/toast presenter.
    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    /// Swaps the retry classification strategy (default: retry everything).
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Overrides the backoff schedule between retry attempts.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Overrides the process-wide per-attempt deadline.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Overrides the process-wide retry budget.
    pub fn default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    /// Overrides the default TTL for cached reads.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Overrides the cache sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Builds the client and spawns its cache sweeper.
    ///
    /// Must be called within a tokio runtime; the sweep task is aborted when
    /// the client is dropped.
    pub fn build(self) -> Client {
        let cache = Arc::new(TtlCache::new(self.cache_ttl));
        let sweeper = spawn_sweeper(Arc::clone(&cache), self.sweep_interval);
        Client {
            transport: self.transport,
            probe: self.probe,
            credentials: self.credentials,
            presenter: self.presenter,
            retry_policy: self.retry_policy,
            backoff: self.backoff,
            default_timeout: self.default_timeout,
            default_max_retries: self.default_max_retries,
            cache,
            coalescer: RequestCoalescer::new(),
            sweeper,
        }
    }
}

/// The resilient request client.
///
/// Safe under concurrent invocation from any number of logical callers; share
/// one instance per process (typically behind an [`Arc`]). See the
/// [module docs](self) for the pipeline.
pub struct Client {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ConnectivityProbe>,
    credentials: Arc<dyn CredentialStore>,
    presenter: Arc<dyn Presenter>,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff: Backoff,
    default_timeout: Duration,
    default_max_retries: u32,
    cache: Arc<TtlCache<ApiResponse<Value>>>,
    coalescer: RequestCoalescer<ApiResponse<Value>>,
    sweeper: JoinHandle<()>,
}

impl Client {
    /// Starts a [`ClientBuilder`] around the given transport.
    pub fn builder(transport: impl Transport + 'static) -> ClientBuilder {
        ClientBuilder::new(transport)
    }

    // ── Verb helpers ──────────────────────────────────────────────────────────

    /// Fetches a resource. Caching is on by default for reads; pass
    /// `use_cache: Some(false)` in `options` to bypass it.
    pub async fn read<T: DeserializeOwned>(
        &self,
        endpoint: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let descriptor = RequestDescriptor::new(Verb::Read, endpoint)
            .use_cache(true)
            .apply(options);
        self.request(descriptor).await
    }

    /// Creates a resource. Never touches the cache.
    pub async fn create<T: DeserializeOwned>(
        &self,
        endpoint: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut descriptor = RequestDescriptor::new(Verb::Create, endpoint);
        if let Some(body) = body {
            descriptor = descriptor.payload(body);
        }
        self.request(descriptor.apply(options)).await
    }

    /// Replaces a resource. Never touches the cache.
    pub async fn replace<T: DeserializeOwned>(
        &self,
        endpoint: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut descriptor = RequestDescriptor::new(Verb::Replace, endpoint);
        if let Some(body) = body {
            descriptor = descriptor.payload(body);
        }
        self.request(descriptor.apply(options)).await
    }

    /// Removes a resource. Never touches the cache.
    pub async fn remove<T: DeserializeOwned>(
        &self,
        endpoint: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let descriptor = RequestDescriptor::new(Verb::Remove, endpoint).apply(options);
        self.request(descriptor).await
    }

    // ── Cache control ─────────────────────────────────────────────────────────

    /// Drops every cached read. Call on logout.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops cached reads whose endpoint starts with `prefix`. Call after
    /// mutating a resource family.
    pub fn clear_cache_by_endpoint(&self, prefix: &str) {
        self.cache.clear_by_prefix(prefix);
    }

    // ── Core pipeline ─────────────────────────────────────────────────────────

    /// Runs one logical call described by `descriptor` and decodes the
    /// response data into `T`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; see the [error taxonomy](crate::error). When the
    /// descriptor opts in, a human-readable message is also pushed to the
    /// presenter — that side channel never replaces the returned error.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.execute(descriptor).await?.into_typed()
    }

    /// The untyped pipeline: presentation side effects around `dispatch`.
    async fn execute(&self, descriptor: RequestDescriptor) -> Result<ApiResponse<Value>, ApiError> {
        let fingerprint = descriptor.fingerprint();

        if descriptor.wants_loading_ui() {
            self.presenter.show_loading(true);
        }

        let outcome = self.dispatch(&descriptor, &fingerprint).await;

        if descriptor.wants_loading_ui() {
            self.presenter.show_loading(false);
        }
        if let Err(error) = &outcome {
            warn!(fingerprint = %fingerprint, error = %error, "request failed");
            if descriptor.wants_error_ui() {
                self.presenter.show_error(error.user_message());
            }
        }
        outcome
    }

    /// Gate → cache → coalesced, retried, deadline-bounded exchange → cache.
    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        fingerprint: &Fingerprint,
    ) -> Result<ApiResponse<Value>, ApiError> {
        // Fast local short-circuit; consumes no retry attempt.
        if !self.probe.is_online() {
            return Err(ApiError::NetworkUnavailable);
        }

        let cacheable = descriptor.verb() == Verb::Read && descriptor.wants_cache();
        if cacheable {
            if let Some(hit) = self.cache.get(fingerprint) {
                debug!(fingerprint = %fingerprint, "cache hit");
                return Ok(hit);
            }
        }

        let exchange = self.prepare_exchange(descriptor);
        let limit = descriptor
            .timeout_override()
            .unwrap_or(self.default_timeout);
        let max_retries = descriptor
            .max_retries_override()
            .unwrap_or(self.default_max_retries);
        let transport = Arc::clone(&self.transport);
        let policy = Arc::clone(&self.retry_policy);
        let backoff = self.backoff;

        let outcome = self
            .coalescer
            .run_exclusive(fingerprint, move || async move {
                run_with_retry(policy.as_ref(), backoff, max_retries, move |_attempt| {
                    let flight = transport.exchange(exchange.clone());
                    async move {
                        with_deadline(
                            async move {
                                let raw = flight
                                    .await
                                    .map_err(|error| ApiError::transport(error.message))?;
                                ApiResponse::from_raw(&raw)
                            },
                            limit,
                        )
                        .await
                    }
                })
                .await
            })
            .await;

        if cacheable {
            if let Ok(envelope) = &outcome {
                match descriptor.cache_ttl_override() {
                    Some(ttl) => {
                        self.cache
                            .insert_with_ttl(fingerprint.clone(), envelope.clone(), ttl)
                    }
                    None => self.cache.insert(fingerprint.clone(), envelope.clone()),
                }
            }
        }
        outcome
    }

    /// Assembles the physical request: serialized body, content type, and the
    /// authorization header from the credential store (unless the caller set
    /// one explicitly).
    fn prepare_exchange(&self, descriptor: &RequestDescriptor) -> ExchangeRequest {
        let mut headers = descriptor.headers().clone();
        if !headers.contains("authorization") {
            if let Some(token) = self.credentials.token() {
                headers.insert("Authorization", format!("Bearer {token}"));
            }
        }

        let body = descriptor.payload_value().map(|value| {
            if !headers.contains("content-type") {
                headers.insert("Content-Type", "application/json");
            }
            Bytes::from(value.to_string())
        });

        ExchangeRequest {
            endpoint: descriptor.endpoint().to_string(),
            verb: descriptor.verb(),
            headers,
            body,
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}
