//! Persisted entities, request payloads and OVSDB mirror records.

use l2gw_types::{
    DeviceId, GatewayConnectionId, GatewayId, MacAddress, RemoteGatewayConnectionId,
    RemoteGatewayId, RemoteMacId, SegmentationId,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

// ============================================================================
// Local gateways
// ============================================================================

/// A physical interface on a gateway device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_id: Option<SegmentationId>,
}

/// A device (switch) grouped into a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_name: String,
    pub interfaces: Vec<DeviceInterface>,
}

/// A managed grouping of devices bridging overlay networks to physical ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: GatewayId,
    pub name: String,
    pub tenant_id: String,
    pub devices: Vec<Device>,
}

impl Gateway {
    /// A gateway can carry connections once one of its devices exposes an interface.
    pub fn is_usable(&self) -> bool {
        self.devices.iter().any(|d| !d.interfaces.is_empty())
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.device_name.as_str())
    }
}

/// Binding of a gateway to a virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConnection {
    pub id: GatewayConnectionId,
    pub gateway_id: GatewayId,
    pub network_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_id: Option<SegmentationId>,
    pub tenant_id: String,
}

/// A virtual network known to the core networking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
}

// ============================================================================
// Remote gateways
// ============================================================================

/// A peer gateway that is not locally managed, reachable at `ipaddr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGateway {
    pub id: RemoteGatewayId,
    pub name: String,
    pub ipaddr: IpAddr,
    pub tenant_id: String,
}

/// Cross-site bridging unit: local {gateway, network} bound to a remote gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGatewayConnection {
    pub id: RemoteGatewayConnectionId,
    pub gateway: GatewayId,
    pub network: String,
    pub remote_gateway: RemoteGatewayId,
    pub seg_id: u32,
    /// `None` when the flood flag was never supplied by the caller.
    #[serde(default)]
    pub flood: Option<bool>,
    pub tenant_id: String,
}

/// A remote host reachable through a remote gateway connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMac {
    pub id: RemoteMacId,
    pub mac: MacAddress,
    #[serde(default)]
    pub ipaddr: Option<IpAddr>,
    pub rgw_connection: RemoteGatewayConnectionId,
    pub tenant_id: String,
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_id: Option<SegmentationId>,
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segmentation_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub device_name: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceSpec>,
}

impl DeviceSpec {
    pub fn new(device_name: impl Into<String>, interfaces: Vec<InterfaceSpec>) -> Self {
        Self {
            device_name: device_name.into(),
            interfaces,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySpec {
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
}

/// Partial update of a gateway; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub devices: Option<Vec<DeviceSpec>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConnectionSpec {
    pub gateway_id: GatewayId,
    pub network_id: String,
    #[serde(default)]
    pub segmentation_id: Option<SegmentationId>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGatewaySpec {
    pub name: String,
    pub ipaddr: IpAddr,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGatewayUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ipaddr: Option<IpAddr>,
}

/// Request to bind a local gateway/network to a remote gateway.
///
/// `seg_id` is carried as text the way the API receives it; it is parsed
/// into an integer during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGatewayConnectionSpec {
    pub gateway: GatewayId,
    pub network: String,
    pub remote_gateway: RemoteGatewayId,
    pub seg_id: String,
    #[serde(default)]
    pub flood: Option<bool>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGatewayConnectionUpdate {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub seg_id: Option<String>,
    #[serde(default)]
    pub flood: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMacSpec {
    pub mac: MacAddress,
    #[serde(default)]
    pub ipaddr: Option<IpAddr>,
    pub rgw_connection: RemoteGatewayConnectionId,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

// ============================================================================
// OVSDB mirror records
// ============================================================================

/// Logical switch realised for a network on one OVSDB server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalSwitch {
    pub uuid: Uuid,
    /// Network id the switch was created for.
    pub name: String,
    pub key: u32,
    pub ovsdb_identifier: String,
}

/// Tunnel endpoint (VTEP address plus tunnel key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalLocator {
    pub uuid: Uuid,
    pub dst_ip: IpAddr,
    pub key: u32,
    pub ovsdb_identifier: String,
}

/// Unicast MAC reachable through a remote locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcastMacRemote {
    pub uuid: Uuid,
    pub mac: MacAddress,
    #[serde(default)]
    pub ipaddr: Option<IpAddr>,
    pub logical_switch_id: Uuid,
    pub physical_locator_id: Uuid,
    pub ovsdb_identifier: String,
}

/// Physical switch reported by an OVSDB server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalSwitch {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub tunnel_ip: Option<IpAddr>,
    pub ovsdb_identifier: String,
}

/// Port of a physical switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalPort {
    pub uuid: Uuid,
    pub name: String,
    pub physical_switch_id: Uuid,
    pub ovsdb_identifier: String,
}

/// A gateway device row as returned by name lookup, with its owning gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBinding {
    pub gateway_id: GatewayId,
    pub device: Device,
}
