//! Demo dataset used when the backend cannot supply packages.
//!
//! With `FallbackPolicy::DemoOnFailure` a failed or empty package fetch is
//! reported as a successful one carrying nine fixed Paris packages, so the
//! package list and map are never empty. `FallbackPolicy::Strict` turns
//! this off and lets failures reach the caller.

use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::api::{ApiError, ApiResult};
use crate::models::{Package, PackageListOutcome, PackageSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Propagate every package-fetch failure and return empty lists as-is.
    Strict,
    /// Replace failures and empty lists with the demo dataset.
    #[default]
    DemoOnFailure,
}

impl FallbackPolicy {
    pub fn uses_demo(&self) -> bool {
        matches!(self, FallbackPolicy::DemoOnFailure)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(FallbackPolicy::Strict),
            "demo" | "demo-on-failure" | "demo_on_failure" => Some(FallbackPolicy::DemoOnFailure),
            _ => None,
        }
    }

    /// Decide what a failed package fetch turns into: the demo outcome, or
    /// the failure itself.
    pub fn recover(&self, failure: ApiError) -> ApiResult<PackageListOutcome> {
        if self.uses_demo() {
            warn!(error = %failure, "Package fetch failed, using demo data");
            Ok(demo_outcome())
        } else {
            Err(failure)
        }
    }
}

const DEMO_MESSAGE: &str = "DEMO MODE\n\n\
    Showing sample data while the delivery backend is unavailable.\n\n\
    - 9 sample packages loaded\n\
    - Map available\n\
    - Navigation available";

pub fn demo_message() -> &'static str {
    DEMO_MESSAGE
}

/// The demo outcome: `success = true`, the banner, and the nine packages.
pub fn demo_outcome() -> PackageListOutcome {
    PackageListOutcome {
        success: true,
        message: Some(DEMO_MESSAGE.to_string()),
        packages: demo_packages(),
        source: PackageSource::Demo,
    }
}

#[allow(clippy::too_many_arguments)]
fn demo_package(
    id: &str,
    tracking_number: &str,
    recipient_name: &str,
    address: &str,
    instructions: &str,
    phone: &str,
    priority: &str,
    latitude: f64,
    longitude: f64,
) -> Package {
    Package {
        id: id.to_string(),
        tracking_number: tracking_number.to_string(),
        recipient_name: recipient_name.to_string(),
        address: address.to_string(),
        status: "Pendiente".to_string(),
        instructions: instructions.to_string(),
        phone: Some(phone.to_string()),
        delivery_date: None,
        priority: priority.to_string(),
        latitude: Some(latitude),
        longitude: Some(longitude),
    }
}

/// Nine pending packages spread over Paris, always in this order.
pub fn demo_packages() -> Vec<Package> {
    vec![
        demo_package(
            "demo-001",
            "PU0000867901",
            "Marie Dubois",
            "15 Rue de la Paix, 75001 Paris",
            "Deliver at reception",
            "06 12 34 56 78",
            "1",
            48.8667,
            2.3333,
        ),
        demo_package(
            "demo-002",
            "2E0000153827",
            "Jean Martin",
            "42 Avenue des Champs-Élysées, 75008 Paris",
            "Door code: 1234",
            "06 87 65 43 21",
            "2",
            48.8698,
            2.3076,
        ),
        demo_package(
            "demo-003",
            "S79401757791",
            "Sophie Leroy",
            "8 Rue de Rivoli, 75004 Paris",
            "Letterbox available",
            "06 98 76 54 32",
            "1",
            48.8566,
            2.3522,
        ),
        demo_package(
            "demo-004",
            "PU0000867902",
            "Pierre Moreau",
            "25 Boulevard Saint-Germain, 75005 Paris",
            "Call before delivering",
            "06 11 22 33 44",
            "3",
            48.8500,
            2.3400,
        ),
        demo_package(
            "demo-005",
            "2E0000153828",
            "Claire Bernard",
            "12 Place de la Bastille, 75011 Paris",
            "Leave with a neighbour if absent",
            "06 55 66 77 88",
            "2",
            48.8532,
            2.3694,
        ),
        demo_package(
            "demo-006",
            "S79401757792",
            "Antoine Petit",
            "33 Rue de la République, 75011 Paris",
            "Door code: 5678",
            "06 99 88 77 66",
            "1",
            48.8630,
            2.3650,
        ),
        demo_package(
            "demo-007",
            "PU0000867903",
            "Isabelle Roux",
            "7 Avenue de la Grande Armée, 75017 Paris",
            "Letterbox in the courtyard",
            "06 44 33 22 11",
            "2",
            48.8756,
            2.2847,
        ),
        demo_package(
            "demo-008",
            "2E0000153829",
            "François Blanc",
            "19 Rue de Belleville, 75019 Paris",
            "Deliver during office hours",
            "06 77 88 99 00",
            "3",
            48.8722,
            2.3764,
        ),
        demo_package(
            "demo-009",
            "S79401757793",
            "Nathalie Durand",
            "5 Place du Tertre, 75018 Paris",
            "Door code: 9999",
            "06 12 34 56 78",
            "1",
            48.8867,
            2.3431,
        ),
    ]
}
