use crate::core::price::Source;
use thiserror::Error;

/// Why a single (pair, source) fetch produced no observation.
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {code}")]
    UnexpectedStatus { code: u16, body: Option<String> },

    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl FetchFailure {
    pub fn malformed(reason: impl Into<String>) -> Self {
        FetchFailure::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Network(_) => "network_error",
            FetchFailure::UnexpectedStatus { .. } => "unexpected_status",
            FetchFailure::MalformedPayload { .. } => "malformed_payload",
            FetchFailure::InvalidEndpoint { .. } => "invalid_endpoint",
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        FetchFailure::Network(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Disk(#[from] fjall::Error),

    #[error("failed to encode or decode observation: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt storage key of {0} bytes")]
    CorruptKey(usize),

    #[error("row counter lock poisoned")]
    Poisoned,
}

/// Outcome of one job inside a tick that did not end with a stored observation.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("pair {0} is not in the catalog")]
    UnknownPair(String),

    #[error("no endpoint configured for {0}")]
    MissingEndpoint(Source),

    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error("failed to store observation: {0}")]
    StoreWrite(#[from] StoreError),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::UnknownPair(_) => "unknown_pair",
            IngestError::MissingEndpoint(_) => "missing_endpoint",
            IngestError::Fetch(failure) => failure.kind(),
            IngestError::StoreWrite(_) => "store_write_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(FetchFailure::Network("reset".into()).kind(), "network_error");
        assert_eq!(
            FetchFailure::UnexpectedStatus {
                code: 503,
                body: None
            }
            .kind(),
            "unexpected_status"
        );
        assert_eq!(
            IngestError::from(FetchFailure::malformed("no price")).kind(),
            "malformed_payload"
        );
        assert_eq!(
            IngestError::UnknownPair("XYZABC".into()).kind(),
            "unknown_pair"
        );
    }

    #[test]
    fn test_display_includes_context() {
        let failure = FetchFailure::UnexpectedStatus {
            code: 418,
            body: Some("teapot".into()),
        };
        assert_eq!(failure.to_string(), "unexpected HTTP status 418");
        assert_eq!(
            IngestError::MissingEndpoint(Source::Bybit).to_string(),
            "no endpoint configured for Bybit"
        );
    }
}
