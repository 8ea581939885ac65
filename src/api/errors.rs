use thiserror::Error;

/// How a failure is surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced a usable response.
    NetworkFailure,
    /// The response arrived but carried nothing to show.
    NoData,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("unexpected response shape from {endpoint}: {reason}")]
    Parse { endpoint: String, reason: String },

    #[error("{endpoint} returned no data")]
    NoData { endpoint: String },

    #[error("invalid API base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ApiError {
    pub fn parse(endpoint: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Parse {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn no_data(endpoint: &str) -> Self {
        ApiError::NoData {
            endpoint: endpoint.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Transport { .. } | ApiError::Status { .. } | ApiError::InvalidBaseUrl { .. } => {
                FailureKind::NetworkFailure
            }
            ApiError::Parse { .. } | ApiError::NoData { .. } => FailureKind::NoData,
        }
    }

    /// Message for the view region that failed to load `what`.
    pub fn user_message(&self, what: &str) -> String {
        match self.kind() {
            FailureKind::NetworkFailure => format!("Error loading {what}. Please try again."),
            FailureKind::NoData => format!("No {what} available."),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
