use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A delivery company (societe) drivers can authenticate under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Company {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The full company list as of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CompanyDirectory {
    pub companies: Vec<Company>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub fetched_at: DateTime<Utc>,
}

impl CompanyDirectory {
    pub fn new(companies: Vec<Company>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            companies,
            fetched_at,
        }
    }

    pub fn find(&self, code: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.code == code)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// The company the driver committed to on the selection screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SelectedCompany {
    pub name: String,
    pub code: String,
}

impl SelectedCompany {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

impl From<&Company> for SelectedCompany {
    fn from(company: &Company) -> Self {
        Self::new(company.name.clone(), company.code.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct CompanyListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub message: Option<String>,
}
