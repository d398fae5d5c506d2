use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("failed to transform address: {input}")]
    InvalidAddress { input: String },

    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("gateway returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl GatewayError {
    pub(crate) fn invalid_address(input: impl Into<String>) -> Self {
        GatewayError::InvalidAddress {
            input: input.into(),
        }
    }

    pub fn is_invalid_address(&self) -> bool {
        matches!(self, GatewayError::InvalidAddress { .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
