//! Error handling for namecraft

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for the generation pipeline.
///
/// Every variant maps to a stable machine-readable condition code and an
/// HTTP-style status class so callers can branch (retry vs. upgrade vs. fix
/// input) without string matching.
#[derive(Error, Debug, Clone)]
pub enum NamecraftError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not configured: {message}")]
    NotConfigured { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Usage limit reached")]
    UsageLimitReached,

    #[error("Bad gateway: {message}")]
    BadGateway { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        url: Option<String>,
    },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        content: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl NamecraftError {
    /// Create a not-configured error
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(
        message: impl Into<String>,
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    ) -> Self {
        Self::RateLimited {
            message: message.into(),
            limit,
            remaining,
            reset_at,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a bad gateway error
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        url: Option<String>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            url,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>, content: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            content,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable condition code for API envelopes.
    pub fn condition_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotConfigured { .. } => "NOT_CONFIGURED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::UsageLimitReached => "USAGE_LIMIT_REACHED",
            Self::BadGateway { .. } => "BAD_GATEWAY",
            Self::Network { .. } | Self::Timeout { .. } | Self::Parse { .. } => "BAD_GATEWAY",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP-style status class this condition maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::NotConfigured { .. } => 500,
            Self::RateLimited { .. } => 429,
            Self::InvalidInput { .. } => 400,
            Self::UsageLimitReached => 402,
            Self::BadGateway { .. } => 502,
            Self::Network { .. } | Self::Timeout { .. } | Self::Parse { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::BadGateway { .. }
                | Self::Network { .. }
                | Self::Timeout { .. }
        )
    }

    /// Seconds until the rate-limit window resets, if this is a rate-limit
    /// rejection. Rounded up, so a still-open window never reports zero.
    /// Suitable for a Retry-After header.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        match self {
            Self::RateLimited { reset_at, .. } => {
                let millis = (*reset_at - now).num_milliseconds().max(0) as u64;
                Some(millis.div_ceil(1000))
            }
            _ => None,
        }
    }
}

/// Convert from common error types
impl From<reqwest::Error> for NamecraftError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| u.to_string());

        if err.is_timeout() {
            Self::timeout("HTTP request", 30_000)
        } else if err.is_connect() {
            Self::network("Connection failed", status_code, url)
        } else if err.is_request() {
            Self::network("Request failed", status_code, url)
        } else {
            Self::network(err.to_string(), status_code, url)
        }
    }
}

impl From<serde_json::Error> for NamecraftError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}

impl From<tokio::time::error::Elapsed> for NamecraftError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("Operation", 30_000)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NamecraftError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_condition_codes_and_statuses() {
        assert_eq!(NamecraftError::Unauthorized.status_code(), 401);
        assert_eq!(NamecraftError::Unauthorized.condition_code(), "UNAUTHORIZED");

        let err = NamecraftError::invalid_input("description too short");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.condition_code(), "INVALID_INPUT");

        assert_eq!(NamecraftError::UsageLimitReached.status_code(), 402);
        assert_eq!(
            NamecraftError::bad_gateway("invalid model response").status_code(),
            502
        );
        assert_eq!(
            NamecraftError::not_configured("missing api key").status_code(),
            500
        );
    }

    #[test]
    fn test_retry_after() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let reset = now + chrono::Duration::seconds(42);
        let err = NamecraftError::rate_limited("too many requests", 20, 0, reset);
        assert_eq!(err.retry_after_secs(now), Some(42));
        assert!(err.is_retryable());
        // A reset in the past clamps to zero
        assert_eq!(
            err.retry_after_secs(reset + chrono::Duration::seconds(5)),
            Some(0)
        );
    }

    #[test]
    fn test_retry_after_rounds_up_sub_second_remainder() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let reset = now + chrono::Duration::milliseconds(1500);
        let err = NamecraftError::rate_limited("too many requests", 20, 0, reset);
        assert_eq!(err.retry_after_secs(now), Some(2));
        // A window still open by less than a second never reports zero.
        let barely = now + chrono::Duration::milliseconds(10);
        assert_eq!(err.retry_after_secs(reset - chrono::Duration::milliseconds(10)), Some(1));
        assert!(err.retry_after_secs(barely).unwrap() >= 1);
    }

    #[test]
    fn test_quota_and_rate_limit_are_distinct() {
        let now = Utc::now();
        let quota = NamecraftError::UsageLimitReached;
        let rate = NamecraftError::rate_limited("slow down", 20, 0, now);
        assert_ne!(quota.condition_code(), rate.condition_code());
        assert_ne!(quota.status_code(), rate.status_code());
        assert!(!quota.is_retryable());
    }
}
