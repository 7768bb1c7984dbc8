//! API client for the delivery backend.
//!
//! This module provides the `BackendClient` struct and its configuration.
//! Requests are JSON over HTTP/1.1 with a fixed header set. Nothing is
//! retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use crate::clock::{Clock, SystemClock};
use crate::fallback::{self, FallbackPolicy};
use crate::models::wire::{
    CompanyListResponse, LoginRequest, LoginResponse, MobileStatsResponse, PackagesRequest,
    PackagesResponse, StatusUpdateResponse, TourRequest, TourResponse,
};
use crate::models::{
    CompanyDirectory, Credentials, LoginOutcome, PackageListOutcome, PackageSource,
    SessionIdentity, StatusUpdate, Tour, TourStats,
};

// ============================================================================
// Constants
// ============================================================================

const AUTH_PATH: &str = "/api/colis-prive/auth";
const PACKAGES_PATH: &str = "/api/colis-prive/packages";
const COMPANIES_PATH: &str = "/api/colis-prive/companies";
const TOUR_PATH: &str = "/api/mobile/tournee";
const UPDATE_STATUS_PATH: &str = "/api/mobile/package/update-status";
const MOBILE_STATS_PATH: &str = "/api/mobile/stats";

/// Default connect, read and write timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent the backend expects from the mobile client.
pub const USER_AGENT: &str = "okhttp/3.4.1";

// ============================================================================
// Configuration
// ============================================================================

/// How much of each exchange to log, at `debug` level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpLogLevel {
    #[default]
    None,
    /// Method, endpoint, status and size.
    Basic,
    /// Also request and response bodies, with passwords masked.
    Body,
}

impl HttpLogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Some(HttpLogLevel::None),
            "basic" => Some(HttpLogLevel::Basic),
            "body" | "full" => Some(HttpLogLevel::Body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub log_level: HttpLogLevel,
    pub fallback: FallbackPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            base_url: base_url.into(),
            connect_timeout: timeout,
            read_timeout: timeout,
            write_timeout: timeout,
            log_level: HttpLogLevel::default(),
            fallback: FallbackPolicy::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_log_level(mut self, log_level: HttpLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Use the same duration for connect, read and write.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    /// reqwest has no separate write timeout, so the whole exchange is
    /// bounded by the sum of the three.
    fn total_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout + self.write_timeout
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for the delivery backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    log_level: HttpLogLevel,
    fallback: FallbackPolicy,
    token: Option<String>,
    clock: Arc<dyn Clock>,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got {:?}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .default_headers(Self::default_headers()?)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.total_timeout())
            .build()?;

        debug!(
            base_url = %base_url,
            log_level = ?config.log_level,
            fallback = ?config.fallback,
            "Backend client configured"
        );

        Ok(Self {
            client,
            base_url,
            log_level: config.log_level,
            fallback: config.fallback,
            token: None,
            clock,
        })
    }

    /// Create a client that sends the given bearer token, sharing the
    /// connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()).filter(|t: &String| !t.is_empty()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback
    }

    fn default_headers() -> ApiResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        let fixed = [
            (header::ACCEPT_CHARSET, "UTF-8"),
            (header::CONTENT_TYPE, "application/json; charset=UTF-8"),
            (header::CONNECTION, "Keep-Alive"),
            (header::ACCEPT_ENCODING, "gzip"),
            (header::USER_AGENT, USER_AGENT),
        ];
        for (name, value) in fixed {
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| ApiError::Config(e.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode a 2xx JSON body. Non-2xx and empty bodies
    /// become `ApiError::Http`; everything else that goes wrong is
    /// `ApiError::Transport`.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> ApiResult<T> {
        if self.log_level >= HttpLogLevel::Basic {
            debug!(method, endpoint = path, "Sending request");
        }

        let response = self.authorize(request).send().await.map_err(|e| {
            warn!(method, endpoint = path, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(method, endpoint = path, error = %e, "Failed to read response body");
            ApiError::from(e)
        })?;

        if self.log_level >= HttpLogLevel::Basic {
            debug!(method, endpoint = path, status = status.as_u16(), bytes = text.len(), "Response received");
        }
        if self.log_level >= HttpLogLevel::Body {
            debug!(endpoint = path, body = %text, "Response body");
        }

        if !status.is_success() {
            warn!(method, endpoint = path, status = status.as_u16(), "Backend returned an error status");
            return Err(ApiError::from_status(status, &text));
        }
        if text.trim().is_empty() {
            warn!(method, endpoint = path, status = status.as_u16(), "Backend returned an empty body");
            return Err(ApiError::from_status(status, ""));
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(method, endpoint = path, error = %e, "Failed to parse response body");
            ApiError::from(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.client.get(self.url(path));
        self.execute(request, "GET", path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        if self.log_level >= HttpLogLevel::Body {
            debug!(endpoint = path, body = %redacted_json(body), "Request body");
        }
        // Serialized by hand so the default Content-Type (with charset) is kept
        let payload = serde_json::to_vec(body)?;
        let request = self.client.post(self.url(path)).body(payload);
        self.execute(request, "POST", path).await
    }

    // ===== Authentication =====

    /// Log in. A rejected login (`success: false`) is returned as an
    /// unsuccessful `LoginOutcome`, not as an error.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        company_code: &str,
    ) -> ApiResult<LoginOutcome> {
        info!(username, societe = company_code, "Logging in");

        let request = LoginRequest {
            username,
            password,
            societe: company_code,
        };
        let response: LoginResponse = self.post(AUTH_PATH, &request).await?;
        let outcome = LoginOutcome::from(response);

        if outcome.success {
            info!(matricule = %outcome.matricule, "Login succeeded");
        } else {
            warn!(error = ?outcome.error_message, "Login rejected by backend");
        }
        Ok(outcome)
    }

    /// Log in and build the session identity. A rejected login is an
    /// `ApiError::Domain` carrying the backend's message.
    pub async fn authenticate(&self, credentials: &Credentials) -> ApiResult<SessionIdentity> {
        let outcome = self
            .login(
                &credentials.username,
                &credentials.password,
                &credentials.company_code,
            )
            .await?;

        if !outcome.success {
            return Err(ApiError::domain(outcome.error_message, outcome.error_code));
        }
        if outcome.matricule.is_empty() {
            return Err(ApiError::domain(
                Some("Login response carried no matricule".to_string()),
                None,
            ));
        }

        Ok(SessionIdentity::new(
            credentials.company_code.clone(),
            &credentials.username,
            outcome.matricule,
            outcome.token,
        ))
    }

    // ===== Companies =====

    pub async fn get_companies(&self) -> ApiResult<CompanyDirectory> {
        let response: CompanyListResponse = self.get(COMPANIES_PATH).await?;
        if !response.success {
            return Err(ApiError::domain(response.message, None));
        }

        info!(count = response.companies.len(), "Companies fetched");
        Ok(CompanyDirectory::new(response.companies, self.clock.now()))
    }

    // ===== Packages =====

    /// Fetch the driver's packages. `date` defaults to today on the backend.
    ///
    /// Under `FallbackPolicy::DemoOnFailure` this does not fail: an empty
    /// list, an error status, a `success: false` body or a network failure
    /// all produce the demo outcome.
    pub async fn get_packages(
        &self,
        matricule: &str,
        company_code: &str,
        date: Option<NaiveDate>,
    ) -> ApiResult<PackageListOutcome> {
        info!(matricule, societe = company_code, ?date, "Fetching packages");

        let request = PackagesRequest {
            matricule,
            societe: company_code,
            date,
        };

        let failure = match self.post::<PackagesResponse, _>(PACKAGES_PATH, &request).await {
            Ok(response) if response.success => {
                let packages = response.packages.unwrap_or_default();
                if packages.is_empty() && self.fallback.uses_demo() {
                    info!("Backend returned no packages, using demo data");
                    return Ok(fallback::demo_outcome());
                }

                info!(count = packages.len(), "Packages fetched");
                return Ok(PackageListOutcome {
                    success: true,
                    message: response.message,
                    packages,
                    source: PackageSource::Live,
                });
            }
            Ok(response) => {
                let (message, code) = match response.error {
                    Some(error) => (Some(error.message), error.code),
                    None => (response.message, None),
                };
                ApiError::domain(message, code)
            }
            Err(e) => e,
        };

        self.fallback.recover(failure)
    }

    // ===== Mobile tour =====

    pub async fn get_tour(&self, driver_id: &str, date: NaiveDate) -> ApiResult<Tour> {
        let request = TourRequest { driver_id, date };
        let response: TourResponse = self.post(TOUR_PATH, &request).await?;
        match response.data {
            Some(tour) if response.success => {
                info!(packages = tour.packages.len(), "Tour fetched");
                Ok(tour)
            }
            _ => Err(ApiError::domain(response.message, None)),
        }
    }

    /// Report a delivery status. Returns the backend's message, if any.
    pub async fn update_package_status(&self, update: &StatusUpdate) -> ApiResult<Option<String>> {
        info!(package_id = %update.package_id, status = %update.status, "Updating package status");
        let response: StatusUpdateResponse = self.post(UPDATE_STATUS_PATH, update).await?;
        if !response.success {
            return Err(ApiError::domain(response.message, None));
        }
        Ok(response.message)
    }

    pub async fn get_mobile_stats(&self) -> ApiResult<TourStats> {
        let response: MobileStatsResponse = self.get(MOBILE_STATS_PATH).await?;
        match response.data {
            Some(stats) if response.success => Ok(stats),
            _ => Err(ApiError::domain(response.message, None)),
        }
    }
}

/// Serialize a request body for logging with any `password` field masked.
fn redacted_json<B: Serialize>(body: &B) -> String {
    match serde_json::to_value(body) {
        Ok(mut value) => {
            if let Some(password) = value.get_mut("password") {
                *password = serde_json::Value::String("********".to_string());
            }
            value.to_string()
        }
        Err(_) => "<unserializable>".to_string(),
    }
}
