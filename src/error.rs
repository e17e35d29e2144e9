use thiserror::Error;

/// Failures talking to an exchange gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("order rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("missing credential {0}")]
    MissingCredential(&'static str),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
