//! Test fixtures for common gateway scenarios.
//!
//! Request builders produce the payloads the API layer would pass in;
//! `seed_*` helpers populate the OVSDB mirror tables that only the
//! southbound side writes in production.

use l2gw_db::*;
use l2gw_types::{GatewayId, MacAddress, RemoteGatewayId, RemoteMacId, SegmentationId};
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Tenant used by fixtures unless a test says otherwise.
pub const TENANT: &str = "tenant-1";

/// OVSDB server managing the switches that fail in failover tests.
pub const OVSDB_FAILED: &str = "ovsdb1";

/// OVSDB server managing spare switches.
pub const OVSDB_SPARE: &str = "ovsdb2";

/// Networks registered by [`seeded_store`].
pub const NETWORKS: [&str; 3] = ["net1", "net2", "net3"];

fn seg(id: u16) -> SegmentationId {
    match SegmentationId::new(id) {
        Ok(seg) => seg,
        Err(e) => panic!("fixture segmentation id: {e}"),
    }
}

fn parse_ip(ip: &str) -> IpAddr {
    match ip.parse() {
        Ok(ip) => ip,
        Err(e) => panic!("fixture ip {ip}: {e}"),
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// Gateway with one device exposing one interface.
pub fn gateway_spec(name: &str, device: &str, interface: &str) -> GatewaySpec {
    GatewaySpec {
        name: name.to_string(),
        tenant_id: None,
        devices: vec![DeviceSpec::new(device, vec![InterfaceSpec::new(interface)])],
    }
}

/// Gateway with several devices, each listing its interface names.
pub fn multi_device_gateway_spec(name: &str, devices: &[(&str, &[&str])]) -> GatewaySpec {
    GatewaySpec {
        name: name.to_string(),
        tenant_id: None,
        devices: devices
            .iter()
            .map(|(device, ifaces)| {
                DeviceSpec::new(*device, ifaces.iter().map(|i| InterfaceSpec::new(*i)).collect())
            })
            .collect(),
    }
}

pub fn connection_spec(
    gateway_id: GatewayId,
    network_id: &str,
    segmentation_id: Option<u16>,
) -> GatewayConnectionSpec {
    GatewayConnectionSpec {
        gateway_id,
        network_id: network_id.to_string(),
        segmentation_id: segmentation_id.map(seg),
        tenant_id: None,
    }
}

pub fn remote_gateway_spec(name: &str, ipaddr: &str) -> RemoteGatewaySpec {
    RemoteGatewaySpec {
        name: name.to_string(),
        ipaddr: parse_ip(ipaddr),
        tenant_id: None,
    }
}

pub fn remote_connection_spec(
    gateway: GatewayId,
    network: &str,
    remote_gateway: RemoteGatewayId,
    seg_id: &str,
    flood: Option<bool>,
) -> RemoteGatewayConnectionSpec {
    RemoteGatewayConnectionSpec {
        gateway,
        network: network.to_string(),
        remote_gateway,
        seg_id: seg_id.to_string(),
        flood,
        tenant_id: None,
    }
}

pub fn remote_mac_spec(
    mac: &str,
    rgw_connection: l2gw_types::RemoteGatewayConnectionId,
    ipaddr: Option<&str>,
) -> RemoteMacSpec {
    let mac: MacAddress = match mac.parse() {
        Ok(mac) => mac,
        Err(e) => panic!("fixture mac {mac}: {e}"),
    };
    RemoteMacSpec {
        mac,
        ipaddr: ipaddr.map(parse_ip),
        rgw_connection,
        tenant_id: None,
    }
}

pub fn network(id: &str) -> Network {
    Network {
        id: id.to_string(),
        name: format!("{id}-name"),
        tenant_id: TENANT.to_string(),
    }
}

// ============================================================================
// Store seeding
// ============================================================================

/// Empty store with [`NETWORKS`] registered.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for id in NETWORKS {
        if let Err(e) = store.register_network(network(id)) {
            panic!("seed network {id}: {e}");
        }
    }
    Arc::new(store)
}

/// Adds a physical switch and its ports to the mirror tables.
pub fn seed_physical_switch(
    store: &dyn L2gwStore,
    name: &str,
    ovsdb_identifier: &str,
    ports: &[&str],
) -> PhysicalSwitch {
    let switch = PhysicalSwitch {
        uuid: Uuid::new_v4(),
        name: name.to_string(),
        tunnel_ip: None,
        ovsdb_identifier: ovsdb_identifier.to_string(),
    };
    if let Err(e) = store.upsert_physical_switch(switch.clone()) {
        panic!("seed physical switch {name}: {e}");
    }
    for port in ports {
        let record = PhysicalPort {
            uuid: Uuid::new_v4(),
            name: port.to_string(),
            physical_switch_id: switch.uuid,
            ovsdb_identifier: ovsdb_identifier.to_string(),
        };
        if let Err(e) = store.upsert_physical_port(record) {
            panic!("seed physical port {port}: {e}");
        }
    }
    switch
}

pub fn seed_logical_switch(
    store: &dyn L2gwStore,
    network: &str,
    key: u32,
    ovsdb_identifier: &str,
) -> LogicalSwitch {
    let record = LogicalSwitch {
        uuid: Uuid::new_v4(),
        name: network.to_string(),
        key,
        ovsdb_identifier: ovsdb_identifier.to_string(),
    };
    if let Err(e) = store.upsert_logical_switch(record.clone()) {
        panic!("seed logical switch {network}: {e}");
    }
    record
}

pub fn seed_physical_locator(
    store: &dyn L2gwStore,
    dst_ip: &str,
    key: u32,
    ovsdb_identifier: &str,
) -> PhysicalLocator {
    let record = PhysicalLocator {
        uuid: Uuid::new_v4(),
        dst_ip: parse_ip(dst_ip),
        key,
        ovsdb_identifier: ovsdb_identifier.to_string(),
    };
    if let Err(e) = store.upsert_physical_locator(record.clone()) {
        panic!("seed physical locator {dst_ip}/{key}: {e}");
    }
    record
}

/// Mirror entry the southbound side writes once a remote MAC is realised.
///
/// Keyed by the remote MAC's own id.
pub fn seed_ucast_mac_mirror(
    store: &dyn L2gwStore,
    remote_mac: &RemoteMac,
    logical_switch: &LogicalSwitch,
    locator: &PhysicalLocator,
    ovsdb_identifier: &str,
) -> l2gw_db::UcastMacRemote {
    let record = l2gw_db::UcastMacRemote {
        uuid: *remote_mac.id.as_uuid(),
        mac: remote_mac.mac,
        ipaddr: remote_mac.ipaddr,
        logical_switch_id: logical_switch.uuid,
        physical_locator_id: locator.uuid,
        ovsdb_identifier: ovsdb_identifier.to_string(),
    };
    if let Err(e) = store.upsert_ucast_mac_remote(record.clone()) {
        panic!("seed ucast mac {}: {e}", remote_mac.mac);
    }
    record
}

/// Mirror MAC entry not tied to any remote MAC row.
pub fn seed_orphan_ucast_mac(store: &dyn L2gwStore, mac: &str, ovsdb_identifier: &str) -> Uuid {
    let uuid = Uuid::new_v4();
    let mac: MacAddress = match mac.parse() {
        Ok(mac) => mac,
        Err(e) => panic!("fixture mac {mac}: {e}"),
    };
    let record = l2gw_db::UcastMacRemote {
        uuid,
        mac,
        ipaddr: None,
        logical_switch_id: Uuid::new_v4(),
        physical_locator_id: Uuid::new_v4(),
        ovsdb_identifier: ovsdb_identifier.to_string(),
    };
    if let Err(e) = store.upsert_ucast_mac_remote(record) {
        panic!("seed ucast mac {mac}: {e}");
    }
    uuid
}

/// Id of a remote MAC that was never stored.
pub fn unknown_remote_mac_id() -> RemoteMacId {
    RemoteMacId::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seeded_store_has_networks() {
        let store = seeded_store();
        for id in NETWORKS {
            assert!(store.network_exists(id).unwrap());
        }
        assert!(!store.network_exists("net9").unwrap());
    }

    #[test]
    fn test_seed_physical_switch_with_ports() {
        let store = seeded_store();
        let sw = seed_physical_switch(store.as_ref(), "spare", OVSDB_SPARE, &["eth3", "eth1"]);
        assert_eq!(store.device_interface(&sw.uuid).unwrap().unwrap().name, "eth1");
        assert_eq!(store.physical_switches_by_ovsdb(OVSDB_SPARE).unwrap(), vec![sw]);
    }

    #[test]
    fn test_multi_device_spec() {
        let spec = multi_device_gateway_spec("gw", &[("sw1", &["eth0", "eth1"]), ("sw2", &[])]);
        assert_eq!(spec.devices.len(), 2);
        assert_eq!(spec.devices[0].interfaces.len(), 2);
        assert!(spec.devices[1].interfaces.is_empty());
    }
}
