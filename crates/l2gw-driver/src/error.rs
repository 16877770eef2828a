//! Driver and driver-registry errors.

use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

/// Failure reported by a southbound service driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver refused the operation.
    #[error("driver rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },

    /// The southbound endpoint could not be reached.
    #[error("driver provider {provider} unavailable")]
    Unavailable { provider: String },

    #[error("driver internal error: {0}")]
    Internal(String),
}

impl DriverError {
    pub fn rejected(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Unavailability is transient; a rejection is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Unavailable { .. })
    }
}

/// Errors raised while parsing service providers or building the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid service provider '{0}': expected SERVICE_TYPE:name:driver[:default]")]
    InvalidProvider(String),

    #[error("service provider '{provider}' has service type {found}, expected {expected}")]
    WrongServiceType {
        provider: String,
        expected: &'static str,
        found: String,
    },

    #[error("no service providers configured")]
    NoProviders,

    #[error("duplicate service provider name: {0}")]
    DuplicateProvider(String),

    #[error("multiple default service providers: {0:?}")]
    MultipleDefaults(Vec<String>),

    #[error("no default service provider among {0:?}")]
    NoDefault(Vec<String>),

    #[error("unknown driver '{driver}' for service provider {provider}")]
    UnknownDriver { provider: String, driver: String },

    #[error("failed to construct driver for {provider}: {source}")]
    Construct {
        provider: String,
        #[source]
        source: DriverError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(DriverError::Unavailable {
            provider: "l2gw".to_string()
        }
        .is_retryable());
        assert!(!DriverError::rejected("add_ucast_mac_remote", "bad locator").is_retryable());
        assert!(!DriverError::Internal("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_rejected_display() {
        let err = DriverError::rejected("create_l2_gateway_postcommit", "switch offline");
        assert_eq!(
            err.to_string(),
            "driver rejected create_l2_gateway_postcommit: switch offline"
        );
    }
}
