//! Data models for the delivery backend.
//!
//! This module contains the types exchanged with the backend and kept in
//! the local caches:
//!
//! - `Credentials`, `LoginOutcome`, `SessionIdentity`: authentication
//! - `Company`, `CompanyDirectory`, `SelectedCompany`: tenant selection
//! - `Package`, `PackageListOutcome`: the driver's packages for a day
//! - `Tour`, `MobilePackage`, `TourStats`, `StatusUpdate`: mobile tour API

pub mod auth;
pub mod company;
pub mod package;
pub mod tour;

pub use auth::{Credentials, LoginOutcome, SessionIdentity};
pub use company::{Company, CompanyDirectory, SelectedCompany};
pub use package::{Coordinates, Package, PackageListOutcome, PackageSource};
pub use tour::{DeliveryStatus, MobilePackage, OptimizedRoute, StatusUpdate, Tour, TourStats};

pub(crate) mod wire {
    //! Request and response bodies as the backend spells them.

    pub use super::auth::{LoginRequest, LoginResponse};
    pub use super::company::CompanyListResponse;
    pub use super::package::{PackagesRequest, PackagesResponse};
    pub use super::tour::{MobileStatsResponse, StatusUpdateResponse, TourRequest, TourResponse};

    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct ErrorData {
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub code: Option<String>,
    }
}
