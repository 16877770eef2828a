//! Common types for L2 gateway orchestration.
//!
//! This crate provides the value types shared by the persistence layer,
//! the southbound driver interface and the orchestration core:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses of remote hosts
//! - [`SegmentationId`]: IEEE 802.1Q VLAN tags used on gateway interfaces
//! - Typed entity identifiers ([`GatewayId`], [`RemoteMacId`], ...)
//! - [`RequestContext`]: caller identity carried through every operation

mod context;
mod id;
mod mac;
mod segmentation;

pub use context::RequestContext;
pub use id::{
    DeviceId, GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteGatewayId,
    RemoteMacId,
};
pub use mac::MacAddress;
pub use segmentation::SegmentationId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid segmentation id: {0} (must be 1-4094)")]
    InvalidSegmentationId(String),

    #[error("invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },
}
