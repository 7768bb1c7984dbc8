use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, timeout or (de)serialization failure.
    #[error("Network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status, or with no body.
    #[error("HTTP {status}: {}", truncate_body(.body))]
    Http { status: u16, body: String },

    /// The backend answered 2xx but reported `success: false`.
    #[error("Backend error: {message}")]
    Domain {
        message: String,
        code: Option<String>,
    },

    #[error("Request cancelled")]
    Cancelled,

    /// A call that needs the driver's session was made without one.
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Placeholder body when the backend sent none.
pub(crate) const UNKNOWN_ERROR_BODY: &str = "Unknown error";

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.trim().is_empty() {
            UNKNOWN_ERROR_BODY.to_string()
        } else {
            body.to_string()
        };
        ApiError::Http {
            status: status.as_u16(),
            body,
        }
    }

    pub fn domain(message: Option<String>, code: Option<String>) -> Self {
        ApiError::Domain {
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_BODY.to_string()),
            code,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The session token was rejected; the driver has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Http { status: 401, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Transport(format!("Invalid response body: {}", e))
    }
}
