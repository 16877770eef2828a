//! Errors returned by the orchestration core.

use l2gw_db::DbError;
use l2gw_driver::{DriverError, RegistryError};
use thiserror::Error;

pub type PluginResult<T> = Result<T, PluginError>;

/// A request failed a precondition. Raised before any write or driver call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("gateway must have at least one device")]
    NoDevices,

    #[error("device name must not be empty")]
    EmptyDeviceName,

    #[error("device {device} must have at least one interface")]
    NoInterfaces { device: String },

    #[error("device {device} listed more than once")]
    DuplicateDevice { device: String },

    #[error("interface {interface} listed more than once on device {device}")]
    DuplicateInterface { device: String, interface: String },

    #[error("gateway {gateway} has no device with an interface")]
    GatewayNotUsable { gateway: String },

    #[error("gateway {gateway} is already connected to network {network}")]
    DuplicateConnection { gateway: String, network: String },

    #[error("gateway {gateway} is in use by connections")]
    GatewayInUse { gateway: String },

    #[error("remote gateway {remote_gateway} is in use by connections")]
    RemoteGatewayInUse { remote_gateway: String },

    #[error("invalid segmentation id: {value}")]
    InvalidSegmentationId { value: String },

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("network {network} not found")]
    NetworkNotFound { network: String },
}

/// Outcome of the compensating delete run after a failed create postcommit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// The operation does not compensate (update, delete, remote MAC create).
    NotAttempted,
    /// The just-created entity was removed again.
    Deleted,
    /// Cleanup itself failed; the entity may be orphaned.
    Failed(String),
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} {id} could not be found")]
    NotFound { kind: &'static str, id: String },

    #[error("not authorized to {action} {resource}")]
    NotAuthorized {
        action: &'static str,
        resource: &'static str,
    },

    /// The driver failed. `source` is the driver's own error.
    #[error("{operation} failed")]
    Driver {
        operation: &'static str,
        #[source]
        source: DriverError,
        compensation: Compensation,
    },

    #[error("persistence error: {0}")]
    Db(DbError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<DbError> for PluginError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { kind, id } => PluginError::NotFound { kind, id },
            other => PluginError::Db(other),
        }
    }
}

impl From<RegistryError> for PluginError {
    fn from(err: RegistryError) -> Self {
        PluginError::Config(err.to_string())
    }
}

impl PluginError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        PluginError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn driver(operation: &'static str, source: DriverError) -> Self {
        PluginError::Driver {
            operation,
            source,
            compensation: Compensation::NotAttempted,
        }
    }

    pub fn is_driver_error(&self) -> bool {
        matches!(self, PluginError::Driver { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::NotFound { .. })
    }

    /// The driver error behind this failure, if any.
    pub fn driver_source(&self) -> Option<&DriverError> {
        match self {
            PluginError::Driver { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn compensation(&self) -> Option<&Compensation> {
        match self {
            PluginError::Driver { compensation, .. } => Some(compensation),
            _ => None,
        }
    }

    /// Whether repeating the same request could succeed without changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            PluginError::Driver { source, .. } => source.is_retryable(),
            PluginError::Db(DbError::Io(_)) => true,
            _ => false,
        }
    }

    /// Short machine-readable error class.
    pub fn kind(&self) -> &'static str {
        match self {
            PluginError::Validation(_) => "validation",
            PluginError::NotFound { .. } => "not_found",
            PluginError::NotAuthorized { .. } => "not_authorized",
            PluginError::Driver { .. } => "driver",
            PluginError::Db(_) => "db",
            PluginError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: PluginError = DbError::not_found("gateway", "g1").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "gateway g1 could not be found");
    }

    #[test]
    fn test_driver_error_preserves_source() {
        let err = PluginError::Driver {
            operation: "create_l2_gateway_postcommit",
            source: DriverError::rejected("create_l2_gateway_postcommit", "offline"),
            compensation: Compensation::Deleted,
        };
        assert!(err.is_driver_error());
        assert_eq!(err.compensation(), Some(&Compensation::Deleted));
        let source = err.source().unwrap().to_string();
        assert_eq!(source, "driver rejected create_l2_gateway_postcommit: offline");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable() {
        let err = PluginError::driver(
            "add_ucast_mac_remote",
            DriverError::Unavailable {
                provider: "l2gw".to_string(),
            },
        );
        assert!(err.is_retryable());
        assert!(!PluginError::from(ValidationError::NoDevices).is_retryable());
    }

    #[test]
    fn test_kind() {
        assert_eq!(PluginError::from(ValidationError::NoDevices).kind(), "validation");
        assert_eq!(
            PluginError::NotAuthorized {
                action: "create",
                resource: "l2_remote_mac"
            }
            .kind(),
            "not_authorized"
        );
    }
}
