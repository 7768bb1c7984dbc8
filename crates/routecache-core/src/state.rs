//! Application state owned by the caller.
//!
//! The library holds no global state. A front end keeps an `AppState`,
//! restores it from the caches at startup and feeds it the results of
//! backend calls. The free functions here are the flows the login and
//! company-selection screens drive.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, BackendClient};
use crate::cache::CompanyDirectoryCache;
use crate::models::{
    Company, CompanyDirectory, Credentials, Package, PackageListOutcome, PackageSource,
    SelectedCompany, SessionIdentity,
};
use crate::session::SessionCache;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub session: Option<SessionIdentity>,
    pub selected_company: Option<SelectedCompany>,
    pub companies: Vec<Company>,
    pub packages: Vec<Package>,
    pub package_source: Option<PackageSource>,
    /// Message to show above the package list (the demo banner, usually).
    pub banner: Option<String>,
}

impl AppState {
    /// Rebuild state from the caches. An expired session is purged and
    /// left out.
    pub fn restore(
        sessions: &SessionCache,
        companies: &CompanyDirectoryCache,
        max_age_hours: i64,
    ) -> Self {
        let session = sessions.load_valid_session(max_age_hours);
        let selected_company = companies
            .load_selected_company()
            .or_else(|| sessions.remembered_company());
        let companies = companies
            .load_directory()
            .map(|d| d.companies)
            .unwrap_or_default();

        debug!(
            has_session = session.is_some(),
            has_company = selected_company.is_some(),
            companies = companies.len(),
            "State restored from cache"
        );

        Self {
            session,
            selected_company,
            companies,
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Commit to a company and persist the choice.
    pub fn select_company(&mut self, company: SelectedCompany, cache: &CompanyDirectoryCache) {
        cache.save_selected_company(&company);
        info!(code = %company.code, "Company selected");
        self.selected_company = Some(company);
    }

    pub fn apply_packages(&mut self, outcome: PackageListOutcome) {
        self.banner = if outcome.is_demo() {
            outcome.message
        } else {
            None
        };
        self.package_source = Some(outcome.source);
        self.packages = outcome.packages;
    }

    /// Fetch the logged-in driver's packages into the state. Fails with
    /// `ApiError::NotLoggedIn` when there is no session.
    pub async fn refresh_packages(
        &mut self,
        client: &BackendClient,
        date: Option<NaiveDate>,
    ) -> ApiResult<()> {
        let Some(ref session) = self.session else {
            warn!("Package refresh requested without a session");
            return Err(ApiError::NotLoggedIn);
        };
        let outcome = client
            .get_packages(&session.matricule, &session.company_code, date)
            .await?;
        self.apply_packages(outcome);
        Ok(())
    }

    /// Forget the driver. The selected company is kept for the next login.
    pub fn sign_out(&mut self, sessions: &SessionCache) {
        sessions.clear_session();
        self.session = None;
        self.packages.clear();
        self.package_source = None;
        self.banner = None;
        info!("Signed out");
    }
}

/// Log in and persist the session. The company, if given, is remembered
/// with it.
pub async fn sign_in(
    client: &BackendClient,
    sessions: &SessionCache,
    credentials: &Credentials,
    company: Option<&SelectedCompany>,
) -> ApiResult<SessionIdentity> {
    let identity = client.authenticate(credentials).await?;
    sessions.save_session(&identity);
    if let Some(company) = company {
        sessions.remember_company(company);
    }
    Ok(identity)
}

/// Companies from the cache when it is valid, from the backend otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyLoad {
    pub directory: CompanyDirectory,
    pub from_cache: bool,
}

pub async fn load_companies(
    client: &BackendClient,
    cache: &CompanyDirectoryCache,
    force_refresh: bool,
) -> ApiResult<CompanyLoad> {
    if !force_refresh {
        if let Some(directory) = cache.load_directory() {
            debug!(companies = directory.len(), "Using cached company directory");
            return Ok(CompanyLoad {
                directory,
                from_cache: true,
            });
        }
    }

    let directory = client.get_companies().await?;
    cache.save_directory(&directory);
    Ok(CompanyLoad {
        directory,
        from_cache: false,
    })
}
