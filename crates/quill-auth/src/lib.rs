//! Hosted auth backend client for Quill.
//!
//! Wraps the remote authentication service behind [`AuthClient`]:
//! sign-up, sign-in, sign-out and session retrieval over HTTP, with
//! bounded retry on transient failures and local token persistence in a
//! [`quill_kv::KvStore`].
//!
//! The wire protocol is owned by the backend; this crate only consumes the
//! sign-in / sign-up / sign-out / get-session operations.
//!
//! # State
//!
//! The client holds the current [`Session`] and notifies registered
//! observers on every state transition. [`AuthClient::subscribe`] returns a
//! [`Subscription`] handle; dropping it deregisters the observer (the same
//! RAII shape as a watch handle).
//!
//! # Error classification
//!
//! [`AuthError::is_transient`] marks HTTP 503 and transport-level failures
//! as retryable; everything else is terminal and returned to the caller
//! immediately for display.

mod client;
mod retry;
mod session;

pub use client::{AuthClient, Subscription};
pub use retry::{MAX_ATTEMPTS, with_retry};
pub use session::{AUTH_KEY_PREFIX, AuthEvent, SESSION_KEY, Session, User};

/// Error from auth operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Transport-level failure (connection refused, DNS, timeout).
    /// Always classified as transient.
    #[error("auth request failed")]
    Transport(#[from] ureq::Error),

    /// The backend returned an error status.
    #[error("auth error: {status} - {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        message: String,
    },

    /// Session (de)serialization failure.
    #[error("session serialization error")]
    Json(#[from] serde_json::Error),

    /// Token storage failure.
    #[error("token storage error")]
    Kv(#[from] quill_kv::KvError),
}

impl AuthError {
    /// True when the failure looks temporary and is worth retrying:
    /// HTTP 503, a transport failure, or a network-failure message pattern.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Backend { status, message } => {
                *status == 503
                    || message.contains("Failed to fetch")
                    || message.to_lowercase().contains("network")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_503_is_transient() {
        let err = AuthError::Backend {
            status: 503,
            message: "Service Unavailable".to_owned(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_network_message_is_transient() {
        let err = AuthError::Backend {
            status: 0,
            message: "TypeError: Failed to fetch".to_owned(),
        };
        assert!(err.is_transient());

        let err = AuthError::Backend {
            status: 0,
            message: "NetworkError when attempting to fetch resource".to_owned(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_terminal() {
        for status in [400, 401, 403, 404, 422, 500] {
            let err = AuthError::Backend {
                status,
                message: "invalid credentials".to_owned(),
            };
            assert!(!err.is_transient(), "status {status} must be terminal");
        }
    }

    #[test]
    fn test_auth_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthError>();
    }
}
