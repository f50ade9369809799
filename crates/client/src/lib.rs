//! HTTP client for the VAP media generation API.
//!
//! Provides the shared [`HttpTransport`] (auth, per-tier timeouts, retry,
//! error classification), the typed async [`VapClient`] SDK, task
//! normalization, client-side video pricing and webhook signature helpers.

pub mod client;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pricing;
pub mod retry;
pub mod transport;
pub mod webhooks;

pub use client::{GenerateRequest, ImageSource, MusicRequest, VapClient, VapClientBuilder, VideoRequest};
pub use error::{ApiError, ErrorKind};
pub use normalize::{normalize, NormalizedTask, TaskStatus};
pub use retry::{Backoff, RetryPolicy};
pub use transport::HttpTransport;
pub use webhooks::{generate_webhook_signature, verify_webhook_signature, WebhookEvent};
