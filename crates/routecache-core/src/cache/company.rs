use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info};

use super::envelope::{hours_ttl, is_older_than, CacheEnvelope};
use crate::clock::Clock;
use crate::models::{CompanyDirectory, SelectedCompany};
use crate::store::{KeyValueStore, Namespace};

const NAMESPACE: &str = "company_cache";
const KEY_COMPANIES_CACHE: &str = "companies_cache";
const KEY_CACHE_TIMESTAMP: &str = "cache_timestamp";
const KEY_SELECTED_COMPANY: &str = "selected_company";

/// Company lists change rarely; one fetch per day is enough.
pub const DEFAULT_DIRECTORY_TTL_HOURS: i64 = 24;

/// Caches the company directory and the driver's selected company.
///
/// The directory expires after its TTL. The selected company never
/// expires; it stays until overwritten or cleared.
#[derive(Clone)]
pub struct CompanyDirectoryCache {
    ns: Namespace,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CompanyDirectoryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ns: Namespace::new(store, NAMESPACE),
            clock,
            ttl: hours_ttl(DEFAULT_DIRECTORY_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    // ===== Directory =====

    pub fn save_directory(&self, directory: &CompanyDirectory) {
        let now = self.clock.now_millis();
        self.ns
            .set_json(KEY_COMPANIES_CACHE, &CacheEnvelope::new(directory, now));
        self.ns.set_i64(KEY_CACHE_TIMESTAMP, now);
        debug!(companies = directory.len(), "Company directory cached");
    }

    /// The cached directory, or `None` when missing, expired or corrupt.
    /// Expired and corrupt entries are purged.
    pub fn load_directory(&self) -> Option<CompanyDirectory> {
        let raw = self.ns.get(KEY_COMPANIES_CACHE)?;

        if !self.has_valid_cache() {
            info!("Company directory cache expired, purging");
            self.clear_directory();
            return None;
        }

        match CacheEnvelope::<CompanyDirectory>::decode(&raw) {
            Some(envelope) => Some(envelope.into_payload()),
            None => {
                info!("Company directory cache unreadable, purging");
                self.clear_directory();
                None
            }
        }
    }

    /// TTL check on the stored timestamp alone; the payload is not decoded.
    pub fn has_valid_cache(&self) -> bool {
        let saved_at = self.ns.get_i64(KEY_CACHE_TIMESTAMP);
        !is_older_than(saved_at, self.clock.now_millis(), self.ttl)
    }

    pub fn clear_directory(&self) {
        self.ns.remove(KEY_COMPANIES_CACHE);
        self.ns.remove(KEY_CACHE_TIMESTAMP);
    }

    /// Age of the cached directory for display, e.g. "3h ago".
    pub fn directory_age(&self) -> Option<String> {
        self.ns.get(KEY_COMPANIES_CACHE)?;
        let saved_at = self.ns.get_i64(KEY_CACHE_TIMESTAMP);
        Some(super::envelope::age_display(
            self.clock.now_millis().saturating_sub(saved_at),
        ))
    }

    // ===== Selected company =====

    pub fn save_selected_company(&self, company: &SelectedCompany) {
        let now = self.clock.now_millis();
        self.ns
            .set_json(KEY_SELECTED_COMPANY, &CacheEnvelope::new(company, now));
    }

    pub fn load_selected_company(&self) -> Option<SelectedCompany> {
        let raw = self.ns.get(KEY_SELECTED_COMPANY)?;
        match CacheEnvelope::<SelectedCompany>::decode(&raw) {
            Some(envelope) => Some(envelope.into_payload()),
            None => {
                info!("Selected company cache unreadable, purging");
                self.clear_selected_company();
                None
            }
        }
    }

    pub fn clear_selected_company(&self) {
        self.ns.remove(KEY_SELECTED_COMPANY);
    }

    // ===== Diagnostics =====

    /// Snapshot of the cache contents. Never evicts anything.
    pub fn cache_stats(&self) -> CacheStats {
        let has_valid_cache = self.has_valid_cache();
        let companies_count = if has_valid_cache {
            self.ns
                .get(KEY_COMPANIES_CACHE)
                .and_then(|raw| CacheEnvelope::<CompanyDirectory>::decode(&raw))
                .map(|envelope| envelope.payload.len())
                .unwrap_or(0)
        } else {
            0
        };

        CacheStats {
            has_valid_cache,
            companies_count,
            has_selected_company: self
                .ns
                .get(KEY_SELECTED_COMPANY)
                .and_then(|raw| CacheEnvelope::<SelectedCompany>::decode(&raw))
                .is_some(),
            last_update_epoch_millis: self.ns.get_i64(KEY_CACHE_TIMESTAMP),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub has_valid_cache: bool,
    pub companies_count: usize,
    pub has_selected_company: bool,
    /// `0` when no directory was ever saved
    pub last_update_epoch_millis: i64,
}
