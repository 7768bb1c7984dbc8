//! Local caching for data fetched from the backend.
//!
//! Cached entries are wrapped in a versioned `CacheEnvelope` carrying the
//! save time. An entry older than its TTL is treated as absent and purged
//! on the next read, and so is one that no longer decodes.
//!
//! - `CompanyDirectoryCache`: company list (24h TTL) and selected company
//!   (no TTL)

pub mod company;
pub mod envelope;

pub use company::{CacheStats, CompanyDirectoryCache};
pub use envelope::CacheEnvelope;
