//! REST client for the delivery backend.
//!
//! This module provides the `BackendClient` for logging drivers in and
//! fetching companies, packages and mobile tour data.
//!
//! Every operation returns `ApiResult<T>`. Transport failures, non-2xx
//! responses and `success: false` bodies are reported as distinct
//! `ApiError` kinds. Package fetching is the exception: depending on the
//! configured `FallbackPolicy` it may replace failures with demo data.

pub mod cancel;
pub mod client;
pub mod error;

pub use cancel::{cancellable, AbortHandle};
pub use client::{BackendClient, ClientConfig, HttpLogLevel};
pub use error::{ApiError, ApiResult};
