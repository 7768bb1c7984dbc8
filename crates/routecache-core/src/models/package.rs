use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::wire::ErrorData;

fn default_priority() -> String {
    "Normal".to_string()
}

/// A package assigned to the driver. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Package {
    pub id: String,
    pub tracking_number: String,
    pub recipient_name: String,
    pub address: String,
    pub status: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Package {
    /// Map position, when the backend geocoded the address.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Coordinates {
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
}

/// Where a package list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Live,
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageListOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub packages: Vec<Package>,
    pub source: PackageSource,
}

impl PackageListOutcome {
    pub fn is_demo(&self) -> bool {
        self.source == PackageSource::Demo
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PackagesRequest<'a> {
    pub matricule: &'a str,
    pub societe: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PackagesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub packages: Option<Vec<Package>>,
    #[serde(default)]
    pub error: Option<ErrorData>,
}
