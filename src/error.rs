use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no run collection. Every variant ends the cycle with the
/// error view; none of them are fatal to the process.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Network response was not ok: {status}")]
    Status { status: StatusCode },

    #[error("response body is not a list of test runs: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response lists run id {id:?} more than once")]
    DuplicateId { id: String },
}

/// Coarse taxonomy used for logging and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Timeout { .. } | FetchError::Status { .. } => {
                FetchErrorKind::Transport
            }
            FetchError::Decode(_) | FetchError::DuplicateId { .. } => FetchErrorKind::Decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_carries_status_detail() {
        let err = FetchError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        assert_eq!(
            err.to_string(),
            "Network response was not ok: 503 Service Unavailable"
        );
        assert_eq!(err.kind(), FetchErrorKind::Transport);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err: FetchError = serde_json::from_str::<Vec<u32>>("{").unwrap_err().into();
        assert_eq!(err.kind(), FetchErrorKind::Decode);
        assert!(err.to_string().starts_with("response body is not a list of test runs"));
    }
}
