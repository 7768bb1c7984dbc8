//! Core library for routecache.
//!
//! Provides the session, cache and backend-client layer of the delivery
//! client: drivers log in, pick a company and fetch their packages. Results
//! are cached locally with expiry, and the package list degrades to a fixed
//! demo dataset when the backend cannot supply one.
//!
//! - `api`: `BackendClient` for the delivery REST backend
//! - `session`: `SessionCache` for the logged-in identity
//! - `cache`: `CompanyDirectoryCache` and the versioned `CacheEnvelope`
//! - `store`: namespaced key-value persistence
//! - `fallback`: demo dataset and `FallbackPolicy`
//! - `state`: explicit `AppState` and the flows a UI drives

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod fallback;
pub mod models;
pub mod session;
pub mod state;
pub mod store;

pub use api::{ApiError, ApiResult, BackendClient, ClientConfig};
pub use cache::{CacheEnvelope, CacheStats, CompanyDirectoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use fallback::FallbackPolicy;
pub use session::SessionCache;
pub use state::{load_companies, sign_in, AppState, CompanyLoad};
pub use store::{FileStore, KeyValueStore, MemoryStore};
