use std::time::Duration;

use thiserror::Error;

/// Remote fault codes the vendor documents as transient. Internal errors and
/// rate/concurrency caps recover on their own; every other fault code is a
/// client-side problem the operator has to fix.
const RETRYABLE_FAULT_CODES: &[&str] = &["10001", "20011", "20023", "20024"];

/// Error taxonomy for one extraction run.
///
/// Classification drives retry behavior: `ErrorKind::Retryable` errors go
/// through the backoff loop, everything else aborts the partition immediately.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot cast value {value:?} for column '{column}': {reason}")]
    Cast {
        column: String,
        value: String,
        reason: String,
    },

    #[error("endpoint unreachable ({url}): {reason}; check the endpoint/WSDL URL and network configuration")]
    Endpoint { url: String, reason: String },

    #[error("remote fault {code}: {message}")]
    RemoteFault { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("extraction cancelled")]
    Cancelled,

    #[error("sink error: {0}")]
    Sink(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification consumed by the retry loop and by operators reading
/// logs: only `Config` should prompt a configuration fix rather than a rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or non-transient remote rejection. Never retried.
    Config,
    /// Transient condition, retried within the configured budget.
    Retryable,
    /// Aborts the partition immediately but is not an operator mistake.
    Fatal,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Config(_) | ExtractError::Cast { .. } | ExtractError::Endpoint { .. } => {
                ErrorKind::Config
            }
            ExtractError::RemoteFault { code, .. } => {
                if RETRYABLE_FAULT_CODES.contains(&code.as_str()) {
                    ErrorKind::Retryable
                } else {
                    ErrorKind::Config
                }
            }
            ExtractError::Transport(_) | ExtractError::Timeout(_) => ErrorKind::Retryable,
            ExtractError::Cancelled | ExtractError::Sink(_) | ExtractError::Internal(_) => {
                ErrorKind::Fatal
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_and_limit_faults_are_retryable() {
        for code in ["10001", "20011", "20023", "20024"] {
            let err = ExtractError::RemoteFault {
                code: code.into(),
                message: "boom".into(),
            };
            assert_eq!(err.kind(), ErrorKind::Retryable, "code {code}");
        }
    }

    #[test]
    fn client_faults_are_config_errors() {
        let err = ExtractError::RemoteFault {
            code: "20014".into(),
            message: "authentication failed".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn timeout_and_transport_are_retryable() {
        assert!(ExtractError::Timeout(Duration::from_secs(90)).is_retryable());
        assert!(ExtractError::Transport("connection reset".into()).is_retryable());
    }

    #[test]
    fn endpoint_errors_carry_the_url() {
        let err = ExtractError::Endpoint {
            url: "https://soap.example.com?WSDL".into(),
            reason: "dns resolution failed".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("https://soap.example.com?WSDL"));
    }

    #[test]
    fn cancellation_is_fatal_not_retryable() {
        assert_eq!(ExtractError::Cancelled.kind(), ErrorKind::Fatal);
    }
}
