//! Notification payloads assembled by the orchestration core.

use l2gw_types::{GatewayId, MacAddress};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Unknown-destination/broadcast flooding setup for a remote connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUnknown {
    pub gateway: GatewayId,
    pub network: String,
    pub seg_id: u32,
    /// Address of the remote gateway the traffic is flooded to.
    pub ipaddr: IpAddr,
}

/// Unicast-MAC-remote entry for the southbound switch.
///
/// `ipaddr` is always present on the wire; `None` encodes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcastMacRemote {
    pub mac: MacAddress,
    /// Logical switch uuid.
    pub sw: Uuid,
    /// Physical locator uuid.
    pub locator: Uuid,
    pub gateway: GatewayId,
    pub ipaddr: Option<IpAddr>,
}

/// A port created or deleted in the core networking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMac {
    pub port_id: String,
    pub network_id: String,
    pub mac: MacAddress,
    #[serde(default)]
    pub device_owner: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ucast_mac_remote_serialises_null_ipaddr() {
        let payload = UcastMacRemote {
            mac: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
            sw: Uuid::nil(),
            locator: Uuid::nil(),
            gateway: GatewayId::from_uuid(Uuid::nil()),
            ipaddr: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["ipaddr"], serde_json::Value::Null);
        assert_eq!(value["mac"], "aa:bb:cc:dd:ee:ff");
        assert!(value.as_object().unwrap().contains_key("ipaddr"));
    }
}
