use std::fmt;

use serde::{Deserialize, Serialize};

use super::wire::ErrorData;

/// What the driver types on the login screen. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub company_code: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        company_code: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            company_code: company_code.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .field("company_code", &self.company_code)
            .finish()
    }
}

/// Result of a login call as the backend reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub success: bool,
    pub matricule: String,
    pub token: String,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
}

impl From<LoginResponse> for LoginOutcome {
    fn from(response: LoginResponse) -> Self {
        let (error_message, error_code) = match response.error {
            Some(error) => (Some(error.message), error.code),
            None => (None, None),
        };
        let (matricule, token) = response
            .authentication
            .map(|auth| (auth.matricule, auth.token))
            .unwrap_or_default();
        Self {
            success: response.success,
            matricule,
            token,
            error_message,
            error_code,
        }
    }
}

/// The logged-in driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionIdentity {
    /// `<company_code>_<username>`
    pub full_username: String,
    pub company_code: String,
    pub matricule: String,
    /// Opaque bearer token. Empty when the identity came from the cache.
    pub token: String,
}

impl SessionIdentity {
    pub fn new(
        company_code: impl Into<String>,
        username: &str,
        matricule: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let company_code = company_code.into();
        Self {
            full_username: format!("{}_{}", company_code, username),
            company_code,
            matricule: matricule.into(),
            token: token.into(),
        }
    }

    /// The token, if this identity carries one.
    pub fn bearer_token(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub societe: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub authentication: Option<AuthData>,
    #[serde(default)]
    pub error: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub matricule: String,
    #[serde(default)]
    pub token: String,
}
