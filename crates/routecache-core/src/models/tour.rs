//! Mobile tour API types.
//!
//! The tour endpoints use the backend's Spanish field names; the Rust side
//! uses English names and renames on the wire.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::package::Coordinates;

/// A driver's tour for one day: packages plus the precomputed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Tour {
    #[serde(rename = "paquetes", default)]
    pub packages: Vec<MobilePackage>,
    #[serde(rename = "rutaOptimizada", default)]
    pub optimized_route: Option<OptimizedRoute>,
    #[serde(rename = "estadisticas", default)]
    pub stats: Option<TourStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct MobilePackage {
    pub id: String,
    #[serde(rename = "refColis")]
    pub ref_colis: String,
    #[serde(rename = "coordenadas")]
    pub coordinates: Coordinates,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "prioridad")]
    pub priority: String,
    #[serde(rename = "tipoEntrega")]
    pub delivery_type: String,
}

/// Route computed by the backend. Consumed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OptimizedRoute {
    #[serde(rename = "coordenadasRuta", default)]
    pub route_coordinates: Vec<Coordinates>,
    /// Kilometres
    #[serde(rename = "distanciaTotal")]
    pub total_distance: f64,
    /// Minutes
    #[serde(rename = "tiempoEstimado")]
    pub estimated_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TourStats {
    #[serde(rename = "totalPaquetes")]
    pub total_packages: u32,
    #[serde(rename = "paquetesEntregados")]
    pub delivered_packages: u32,
    #[serde(rename = "paquetesPendientes")]
    pub pending_packages: u32,
}

/// Delivery state reported back to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum DeliveryStatus {
    #[serde(rename = "Entregado")]
    Delivered,
    #[serde(rename = "Fallido")]
    Failed,
    #[serde(rename = "En camino")]
    InTransit,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "Entregado",
            DeliveryStatus::Failed => "Fallido",
            DeliveryStatus::InTransit => "En camino",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "entregado" | "delivered" => Some(DeliveryStatus::Delivered),
            "fallido" | "failed" => Some(DeliveryStatus::Failed),
            "en camino" | "in-transit" | "in_transit" => Some(DeliveryStatus::InTransit),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    #[serde(rename = "packageId")]
    pub package_id: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StatusUpdate {
    pub fn new(package_id: impl Into<String>, status: DeliveryStatus) -> Self {
        Self {
            package_id: package_id.into(),
            status,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TourRequest<'a> {
    #[serde(rename = "driverId")]
    pub driver_id: &'a str,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct TourResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Tour>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MobileStatsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<TourStats>,
    #[serde(default)]
    pub message: Option<String>,
}
