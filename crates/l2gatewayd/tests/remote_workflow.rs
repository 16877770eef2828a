//! Remote gateway, remote connection and remote MAC workflow tests

mod common;

use common::{admin, rejected, tenant, Harness};
use l2gatewayd::{PluginError, RemoteMacAck, ValidationError};
use l2gw_db::{L2gwStore, RemoteGatewayConnection, RemoteGatewayConnectionUpdate};
use l2gw_test::{
    remote_connection_spec, remote_mac_spec, seed_logical_switch, seed_physical_locator,
    seed_ucast_mac_mirror, JournalVerifier, OVSDB_FAILED, OVSDB_SPARE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const PEER_IP: &str = "192.0.2.10";

fn remote_connection(h: &Harness, seg_id: &str, flood: Option<bool>) -> RemoteGatewayConnection {
    let gw = h.gateway("gw1", "sw1");
    let rgw = h.remote_gateway("peer", PEER_IP);
    h.plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "net1", rgw.id, seg_id, flood),
        )
        .unwrap()
}

#[test]
fn test_flood_supplied_sets_up_remote_unknown() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", Some(false));

    assert_eq!(conn.seg_id, 100);
    assert_eq!(conn.flood, Some(false));
    let calls = h.driver.calls_to("create_remote_unknown");
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].payload,
        json!({
            "gateway": conn.gateway.to_string(),
            "network": "net1",
            "seg_id": 100,
            "ipaddr": PEER_IP,
        })
    );
    // Issued after the row is committed.
    assert_eq!(calls[0].tx_depth, Some(0));
}

#[test]
fn test_flood_absent_skips_driver() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);

    assert_eq!(conn.flood, None);
    JournalVerifier::new(&h.driver)
        .assert_not_called("create_remote_unknown")
        .unwrap();
    assert!(h.store.get_remote_gateway_connection(&conn.id).unwrap().is_some());
}

#[test]
fn test_malformed_seg_id_leaves_no_row() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    let rgw = h.remote_gateway("peer", PEER_IP);
    h.driver.clear();

    let err = h
        .plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "net1", rgw.id, "vlan-7", Some(true)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::InvalidSegmentationId { .. })
    ));
    assert!(h.store.list_remote_gateway_connections().unwrap().is_empty());
    assert!(h.driver.calls().is_empty());
}

#[test]
fn test_unknown_network_leaves_no_row() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    let rgw = h.remote_gateway("peer", PEER_IP);
    h.driver.clear();

    let err = h
        .plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "no-such-network", rgw.id, "100", Some(true)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::NetworkNotFound { .. })
    ));
    assert!(h.store.list_remote_gateway_connections().unwrap().is_empty());
    assert!(h.driver.calls().is_empty());
}

#[test]
fn test_remote_unknown_failure_keeps_row() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    let rgw = h.remote_gateway("peer", PEER_IP);
    h.driver
        .fail_on("create_remote_unknown", rejected("create_remote_unknown"));

    let err = h
        .plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "net1", rgw.id, "100", Some(true)),
        )
        .unwrap_err();
    assert!(err.is_driver_error());
    assert_eq!(h.store.list_remote_gateway_connections().unwrap().len(), 1);
}

#[test]
fn test_delete_remote_connection_with_and_without_driver() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    h.plugin
        .delete_remote_gateway_connection(&tenant(), &conn.id, false)
        .unwrap();
    JournalVerifier::new(&h.driver)
        .assert_not_called("delete_l2_remote_gateway_connection")
        .unwrap();
    assert!(h.store.get_remote_gateway_connection(&conn.id).unwrap().is_none());

    let rgw = h.store.list_remote_gateways().unwrap()[0].clone();
    let gw = h.store.list_gateways().unwrap()[0].clone();
    let conn = h
        .plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "net2", rgw.id, "200", None),
        )
        .unwrap();
    h.plugin
        .delete_remote_gateway_connection(&tenant(), &conn.id, true)
        .unwrap();
    let calls = h.driver.calls_to("delete_l2_remote_gateway_connection");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload, json!(conn.id.to_string()));
}

#[test]
fn test_delete_remote_connection_driver_failure_keeps_row() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    h.driver.fail_on(
        "delete_l2_remote_gateway_connection",
        rejected("delete_l2_remote_gateway_connection"),
    );

    assert!(h
        .plugin
        .delete_remote_gateway_connection(&tenant(), &conn.id, true)
        .is_err());
    assert!(h.store.get_remote_gateway_connection(&conn.id).unwrap().is_some());
}

#[test]
fn test_update_remote_connection() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    h.driver.clear();

    let update = RemoteGatewayConnectionUpdate {
        network: None,
        seg_id: Some("300".to_string()),
        flood: Some(true),
    };
    let updated = h
        .plugin
        .update_remote_gateway_connection(&tenant(), &conn.id, &update)
        .unwrap();
    assert_eq!(updated.seg_id, 300);
    assert_eq!(updated.flood, Some(true));
    assert!(h.driver.calls().is_empty());

    let bad = RemoteGatewayConnectionUpdate {
        seg_id: Some("x".to_string()),
        ..Default::default()
    };
    assert!(h
        .plugin
        .update_remote_gateway_connection(&tenant(), &conn.id, &bad)
        .is_err());

    let moved = RemoteGatewayConnectionUpdate {
        network: Some("no-such-network".to_string()),
        ..Default::default()
    };
    let err = h
        .plugin
        .update_remote_gateway_connection(&tenant(), &conn.id, &moved)
        .unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::NetworkNotFound { .. })
    ));
    let stored = h.store.get_remote_gateway_connection(&conn.id).unwrap().unwrap();
    assert_eq!(stored.network, "net1");
}

#[test]
fn test_remote_gateway_in_use_cannot_be_deleted() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);

    let err = h
        .plugin
        .delete_remote_gateway(&tenant(), &conn.remote_gateway)
        .unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::RemoteGatewayInUse { .. })
    ));

    h.plugin
        .delete_remote_gateway_connection(&tenant(), &conn.id, false)
        .unwrap();
    h.plugin
        .delete_remote_gateway(&tenant(), &conn.remote_gateway)
        .unwrap();
    assert!(h.plugin.list_remote_gateways(&tenant()).unwrap().is_empty());
}

#[test]
fn test_remote_mac_requires_admin() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);
    h.driver.clear();

    let err = h
        .plugin
        .create_remote_mac(&tenant(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap_err();
    assert!(matches!(err, PluginError::NotAuthorized { .. }));
    assert_eq!(err.kind(), "not_authorized");
    assert!(h.store.list_remote_macs().unwrap().is_empty());
    assert!(h.driver.calls().is_empty());
}

#[test]
fn test_create_remote_mac_payload_and_ack() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    let ls = seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    let locator = seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);
    // A locator for another key must not be picked.
    seed_physical_locator(h.store.as_ref(), PEER_IP, 200, OVSDB_FAILED);

    let spec = remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None);
    let ack = h.plugin.create_remote_mac(&admin(), &spec).unwrap();
    assert_eq!(
        ack,
        RemoteMacAck {
            mac: spec.mac,
            rgw_connection: conn.id,
        }
    );

    let calls = h.driver.calls_to("add_ucast_mac_remote");
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].payload,
        json!({
            "mac": "aa:bb:cc:00:00:01",
            "sw": ls.uuid.to_string(),
            "locator": locator.uuid.to_string(),
            "gateway": conn.gateway.to_string(),
            "ipaddr": null,
        })
    );
    assert_eq!(h.store.list_remote_macs().unwrap().len(), 1);
}

#[test]
fn test_remote_mac_with_ip() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);

    let spec = remote_mac_spec("aa:bb:cc:00:00:02", conn.id, Some("10.0.0.5"));
    h.plugin.create_remote_mac(&admin(), &spec).unwrap();
    let call = &h.driver.calls_to("add_ucast_mac_remote")[0];
    assert_eq!(call.payload["ipaddr"], "10.0.0.5");
}

#[test]
fn test_remote_mac_without_logical_switch_is_not_found() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);

    let err = h
        .plugin
        .create_remote_mac(&admin(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(h.store.list_remote_macs().unwrap().is_empty());
    JournalVerifier::new(&h.driver)
        .assert_not_called("add_ucast_mac_remote")
        .unwrap();
}

#[test]
fn test_add_ucast_failure_keeps_remote_mac() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);
    h.driver
        .fail_on("add_ucast_mac_remote", rejected("add_ucast_mac_remote"));

    let err = h
        .plugin
        .create_remote_mac(&admin(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap_err();
    assert!(err.is_driver_error());
    assert_eq!(h.store.list_remote_macs().unwrap().len(), 1);
}

#[test]
fn test_delete_remote_mac_targets_mirror_ovsdb() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    let ls = seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_SPARE);
    let locator = seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_SPARE);
    h.plugin
        .create_remote_mac(&admin(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap();
    let mac = h.store.list_remote_macs().unwrap()[0].clone();
    seed_ucast_mac_mirror(h.store.as_ref(), &mac, &ls, &locator, OVSDB_SPARE);

    h.plugin.delete_remote_mac(&admin(), &mac.id).unwrap();

    let calls = h.driver.calls_to("del_ucast_mac_remote");
    assert_eq!(
        calls[0].payload,
        json!({ "ovsdb_identifier": OVSDB_SPARE, "id": mac.id.to_string() })
    );
    assert!(h.store.get_remote_mac(&mac.id).unwrap().is_none());
    assert_eq!(h.plugin.stats().remote_macs_deleted, 1);
}

#[test]
fn test_delete_remote_mac_without_mirror_keeps_row() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);
    h.plugin
        .create_remote_mac(&admin(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap();
    let mac = h.store.list_remote_macs().unwrap()[0].clone();

    let err = h.plugin.delete_remote_mac(&admin(), &mac.id).unwrap_err();
    assert!(err.is_not_found());
    assert!(h.store.get_remote_mac(&mac.id).unwrap().is_some());
    JournalVerifier::new(&h.driver)
        .assert_not_called("del_ucast_mac_remote")
        .unwrap();
}

#[test]
fn test_delete_remote_mac_requires_admin() {
    let h = Harness::new();
    let conn = remote_connection(&h, "100", None);
    seed_logical_switch(h.store.as_ref(), "net1", 100, OVSDB_FAILED);
    seed_physical_locator(h.store.as_ref(), PEER_IP, 100, OVSDB_FAILED);
    h.plugin
        .create_remote_mac(&admin(), &remote_mac_spec("aa:bb:cc:00:00:01", conn.id, None))
        .unwrap();
    let mac = h.store.list_remote_macs().unwrap()[0].clone();

    let err = h.plugin.delete_remote_mac(&tenant(), &mac.id).unwrap_err();
    assert!(matches!(err, PluginError::NotAuthorized { action: "delete", .. }));
    assert!(h.store.get_remote_mac(&mac.id).unwrap().is_some());
}
