//! # refetch
//!
//! A resilient, cache-aware, request-coalescing JSON client built for flaky
//! mobile connectivity.
//!
//! Every screen of an application funnels its network calls through one
//! [`Client`], which layers four defenses around each exchange:
//!
//! - **Network gate** — fail fast, without any attempt, when the device is
//!   offline.
//! - **Request coalescing** — concurrent identical calls share one physical
//!   exchange (duplicate double-tap CREATEs included).
//! - **Retry with capped exponential backoff** — bounded re-attempts behind a
//!   swappable [`RetryPolicy`](retry::RetryPolicy).
//! - **Per-attempt deadlines** — every attempt races a fresh timeout window.
//!
//! Successful reads can be memoized in an in-memory TTL cache that is swept
//! in the background and invalidated explicitly, wholesale or by endpoint
//! prefix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use refetch::{Client, RequestOptions};
//! use refetch::transport::{ExchangeFuture, ExchangeRequest, RawResponse};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Back the client with your platform's HTTP stack; a closure works too.
//!     let client = Client::builder(|req: ExchangeRequest| -> ExchangeFuture {
//!         Box::pin(async move {
//!             let _ = req;
//!             Ok(RawResponse {
//!                 status: 200,
//!                 body: Bytes::from_static(br#"{"code":0,"message":"ok","data":[]}"#),
//!             })
//!         })
//!     })
//!     .build();
//!
//!     let topics = client.read::<Value>("/topics", RequestOptions::default()).await?;
//!     println!("{}", topics.data);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod coalesce;
pub mod error;
pub mod platform;
pub mod request;
pub mod response;
pub mod retry;
pub mod timeout;
pub mod transport;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use client::{Client, ClientBuilder};
pub use error::ApiError;
pub use request::{Headers, RequestDescriptor, RequestOptions, Verb};
pub use response::ApiResponse;
