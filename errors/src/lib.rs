//! # Gradebook Errors
//!
//! Error types shared by the rubric client crates.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields in every message
//! - `ApiError` is `Clone` so failed queries can be kept in the cache

use thiserror::Error;

/// Failures talking to the rubric backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    /// `reason` is the server's text and stays empty when the body had none.
    #[error("Unauthorized access: {}", credentials_reason(.reason))]
    Unauthorized { reason: String },

    #[error("Resource not found: {resource}:{id}")]
    NotFound { resource: String, id: String },

    #[error("Rate limited: retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Backend unavailable: {reason}")]
    Unavailable { reason: String }
}

impl ApiError {
    /// Transport failures and gateway errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Status {
                    status: 502..=504,
                    ..
                }
        )
    }

    pub fn retry_after(&self) -> Option<u64> {
        if let Self::RateLimited { retry_after } = self {
            Some(*retry_after)
        } else {
            None
        }
    }

    /// Message supplied by the server, when there is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Unauthorized { reason: message }
                if !message.trim().is_empty() =>
            {
                Some(message.as_str())
            }
            _ => None
        }
    }

    /// Text for a user-facing notification, falling back to `fallback` when
    /// the server gave nothing usable.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map_or_else(|| fallback.to_string(), str::to_string)
    }
}

fn credentials_reason(reason: &str) -> &str {
    if reason.trim().is_empty() {
        "Invalid or expired credentials"
    } else {
        reason
    }
}

/// Misuse of the board view-model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Missing required identifier: {identifier}")]
    MissingIdentifier { identifier: String },

    #[error("Cannot open {kind} dialog: {reason}")]
    InvalidModal { kind: String, reason: String },

    #[error("No dialog is open")]
    EmptyModalStack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let transport = ApiError::Transport {
            url: "http://localhost".to_string(),
            reason: "connection refused".to_string()
        };
        assert!(transport.is_retryable());

        let gateway = ApiError::Status {
            status: 503,
            message: String::new()
        };
        assert!(gateway.is_retryable());

        let bad_request = ApiError::Status {
            status: 400,
            message: "invalid".to_string()
        };
        assert!(!bad_request.is_retryable());

        let limited = ApiError::RateLimited { retry_after: 30 };
        assert!(!limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(30));
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::Status {
            status: 409,
            message: "Criterion is referenced by a submission".to_string()
        };
        assert_eq!(
            err.user_message("Failed to delete criterion"),
            "Criterion is referenced by a submission"
        );
    }

    #[test]
    fn test_user_message_falls_back() {
        let blank = ApiError::Status {
            status: 500,
            message: "  ".to_string()
        };
        assert_eq!(
            blank.user_message("Failed to delete criterion"),
            "Failed to delete criterion"
        );

        let unavailable = ApiError::Unavailable {
            reason: "Circuit breaker is open".to_string()
        };
        assert_eq!(unavailable.user_message("Failed"), "Failed");
    }

    #[test]
    fn test_unauthorized_without_body_falls_back() {
        let err = ApiError::Unauthorized {
            reason: String::new()
        };
        assert_eq!(err.server_message(), None);
        assert_eq!(
            err.user_message("Failed to delete rubric"),
            "Failed to delete rubric"
        );
        assert_eq!(
            err.to_string(),
            "Unauthorized access: Invalid or expired credentials"
        );

        let explained = ApiError::Unauthorized {
            reason: "Token revoked".to_string()
        };
        assert_eq!(explained.user_message("Failed to delete rubric"), "Token revoked");
        assert_eq!(explained.to_string(), "Unauthorized access: Token revoked");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound {
            resource: "rubric".to_string(),
            id: "r1".to_string()
        };
        assert_eq!(err.to_string(), "Resource not found: rubric:r1");
    }
}
