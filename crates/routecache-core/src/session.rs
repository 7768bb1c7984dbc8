//! Persistence of the logged-in driver.
//!
//! The session lives in the `login_cache` namespace as individual keys.
//! The bearer token is never written: an identity loaded from the cache
//! always has an empty token and the caller must log in again to get one.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::envelope::{hours_ttl, is_older_than};
use crate::clock::Clock;
use crate::models::{SelectedCompany, SessionIdentity};
use crate::store::{KeyValueStore, Namespace};

const NAMESPACE: &str = "login_cache";
const KEY_IS_LOGGED_IN: &str = "is_logged_in";
const KEY_USERNAME: &str = "username";
const KEY_SOCIETE: &str = "societe";
const KEY_MATRICULE: &str = "matricule";
const KEY_LOGIN_TIMESTAMP: &str = "login_timestamp";
const KEY_SELECTED_COMPANY_NAME: &str = "selected_company_name";
const KEY_SELECTED_COMPANY_CODE: &str = "selected_company_code";

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_MAX_AGE_HOURS: i64 = 24;

#[derive(Clone)]
pub struct SessionCache {
    ns: Namespace,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ns: Namespace::new(store, NAMESPACE),
            clock,
        }
    }

    /// Persist the identity, replacing any previous session.
    pub fn save_session(&self, identity: &SessionIdentity) {
        self.ns.set_bool(KEY_IS_LOGGED_IN, true);
        self.ns.set(KEY_USERNAME, &identity.full_username);
        self.ns.set(KEY_SOCIETE, &identity.company_code);
        self.ns.set(KEY_MATRICULE, &identity.matricule);
        self.ns.set_i64(KEY_LOGIN_TIMESTAMP, self.clock.now_millis());
        debug!(username = %identity.full_username, "Session saved");
    }

    /// The cached identity, without checking its age. The token is empty.
    pub fn load_session(&self) -> Option<SessionIdentity> {
        if !self.is_logged_in() {
            return None;
        }

        Some(SessionIdentity {
            full_username: self.ns.get(KEY_USERNAME)?,
            company_code: self.ns.get(KEY_SOCIETE)?,
            matricule: self.ns.get(KEY_MATRICULE)?,
            token: String::new(),
        })
    }

    /// The cached identity if it is younger than `max_age_hours`. An
    /// expired session is cleared.
    pub fn load_valid_session(&self, max_age_hours: i64) -> Option<SessionIdentity> {
        let identity = self.load_session()?;
        if self.is_expired(max_age_hours) {
            info!(username = %identity.full_username, "Cached session expired, clearing");
            self.clear_session();
            return None;
        }
        Some(identity)
    }

    pub fn is_logged_in(&self) -> bool {
        self.ns.get_bool(KEY_IS_LOGGED_IN)
    }

    /// `now - saved > max_age_hours`. A session that was never saved is
    /// expired.
    pub fn is_expired(&self, max_age_hours: i64) -> bool {
        let saved_at = self.ns.get_i64(KEY_LOGIN_TIMESTAMP);
        is_older_than(saved_at, self.clock.now_millis(), hours_ttl(max_age_hours))
    }

    /// Remember the company the driver logged in under. Cleared with the
    /// session.
    pub fn remember_company(&self, company: &SelectedCompany) {
        self.ns.set(KEY_SELECTED_COMPANY_NAME, &company.name);
        self.ns.set(KEY_SELECTED_COMPANY_CODE, &company.code);
    }

    pub fn remembered_company(&self) -> Option<SelectedCompany> {
        Some(SelectedCompany {
            name: self.ns.get(KEY_SELECTED_COMPANY_NAME)?,
            code: self.ns.get(KEY_SELECTED_COMPANY_CODE)?,
        })
    }

    /// Wipe the whole `login_cache` namespace.
    pub fn clear_session(&self) {
        self.ns.clear();
    }
}
