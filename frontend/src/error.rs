use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Network Error: {0}")]
    Transport(String),
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Invalid request body: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Transport(detail) | Self::Decode(detail) | Self::Encode(detail) => detail,
            Self::Status { .. } => "status",
        }
    }

    /// The text recorded in the store, or `fallback` when the error carries no detail.
    pub fn message_or(&self, fallback: &str) -> String {
        if self.detail().trim().is_empty() {
            fallback.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<gloo_net::Error> for ApiError {
    fn from(value: gloo_net::Error) -> Self {
        match value {
            gloo_net::Error::SerdeError(err) => Self::Decode(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
