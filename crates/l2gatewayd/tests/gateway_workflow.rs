//! Gateway and gateway-connection workflow tests
//!
//! Verify driver call ordering around the persistence transaction, the
//! compensating delete after a create postcommit failure, and the accepted
//! desync after update/delete postcommit failures.

mod common;

use common::{rejected, tenant, Harness};
use l2gatewayd::{Compensation, PluginError, ValidationError};
use l2gw_db::{GatewayUpdate, L2gwStore};
use l2gw_test::{connection_spec, gateway_spec, remote_connection_spec, JournalVerifier};
use pretty_assertions::assert_eq;

#[test]
fn test_create_gateway_call_order_and_transaction_depth() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");

    assert_eq!(
        h.driver.operations(),
        vec![
            "create_l2_gateway",
            "create_l2_gateway_precommit",
            "create_l2_gateway_postcommit"
        ]
    );
    let journal = JournalVerifier::new(&h.driver);
    journal.assert_tx_depth("create_l2_gateway", 0).unwrap();
    journal.assert_tx_depth("create_l2_gateway_precommit", 1).unwrap();
    journal.assert_tx_depth("create_l2_gateway_postcommit", 0).unwrap();

    // Precommit and postcommit see the stored instance, id included.
    let post = &h.driver.calls_to("create_l2_gateway_postcommit")[0];
    assert_eq!(post.payload["id"], gw.id.to_string());
    assert_eq!(post.payload["tenant_id"], "tenant-1");
    assert_eq!(h.plugin.stats().gateways_created, 1);
}

#[test]
fn test_validation_failure_reaches_no_driver() {
    let h = Harness::new();
    let mut spec = gateway_spec("gw1", "sw1", "eth0");
    spec.devices.clear();

    let err = h.plugin.create_gateway(&tenant(), &spec).unwrap_err();
    assert!(matches!(err, PluginError::Validation(ValidationError::NoDevices)));
    assert!(h.driver.calls().is_empty());
    assert!(h.store.list_gateways().unwrap().is_empty());
}

#[test]
fn test_pre_call_failure_persists_nothing() {
    let h = Harness::new();
    h.driver.fail_on("create_l2_gateway", rejected("create_l2_gateway"));

    let err = h
        .plugin
        .create_gateway(&tenant(), &gateway_spec("gw1", "sw1", "eth0"))
        .unwrap_err();
    assert!(err.is_driver_error());
    assert_eq!(h.driver.operations(), vec!["create_l2_gateway"]);
    assert!(h.store.list_gateways().unwrap().is_empty());
}

#[test]
fn test_precommit_failure_rolls_back() {
    let h = Harness::new();
    h.driver
        .fail_on("create_l2_gateway_precommit", rejected("create_l2_gateway_precommit"));

    let err = h
        .plugin
        .create_gateway(&tenant(), &gateway_spec("gw1", "sw1", "eth0"))
        .unwrap_err();
    assert_eq!(err.compensation(), Some(&Compensation::NotAttempted));
    assert!(h.store.list_gateways().unwrap().is_empty());
    assert_eq!(h.store.transaction_depth(), 0);
    JournalVerifier::new(&h.driver)
        .assert_not_called("create_l2_gateway_postcommit")
        .unwrap();
}

#[test]
fn test_create_postcommit_failure_deletes_gateway() {
    let h = Harness::new();
    h.driver
        .fail_on("create_l2_gateway_postcommit", rejected("create_l2_gateway_postcommit"));

    let err = h
        .plugin
        .create_gateway(&tenant(), &gateway_spec("gw1", "sw1", "eth0"))
        .unwrap_err();

    match &err {
        PluginError::Driver {
            operation,
            source,
            compensation,
        } => {
            assert_eq!(*operation, "create_l2_gateway_postcommit");
            assert_eq!(source, &rejected("create_l2_gateway_postcommit"));
            assert_eq!(compensation, &Compensation::Deleted);
        }
        other => panic!("expected driver error, got {other:?}"),
    }
    assert!(h.store.list_gateways().unwrap().is_empty());

    JournalVerifier::new(&h.driver)
        .assert_sequence(&[
            "create_l2_gateway_postcommit",
            "delete_l2_gateway",
            "delete_l2_gateway_precommit",
            "delete_l2_gateway_postcommit",
        ])
        .unwrap();
    assert_eq!(h.plugin.stats().compensations, 1);
    assert_eq!(h.plugin.stats().gateways_created, 0);
}

#[test]
fn test_compensation_counts_deleted_when_delete_postcommit_also_fails() {
    let h = Harness::new();
    h.driver
        .fail_on("create_l2_gateway_postcommit", rejected("create_l2_gateway_postcommit"));
    h.driver
        .fail_on("delete_l2_gateway_postcommit", rejected("delete_l2_gateway_postcommit"));

    let err = h
        .plugin
        .create_gateway(&tenant(), &gateway_spec("gw1", "sw1", "eth0"))
        .unwrap_err();
    assert_eq!(err.compensation(), Some(&Compensation::Deleted));
    assert!(h.store.list_gateways().unwrap().is_empty());
}

#[test]
fn test_failed_compensation_is_reported() {
    let h = Harness::new();
    h.driver
        .fail_on("create_l2_gateway_postcommit", rejected("create_l2_gateway_postcommit"));
    h.driver
        .fail_on("delete_l2_gateway_precommit", rejected("delete_l2_gateway_precommit"));

    let err = h
        .plugin
        .create_gateway(&tenant(), &gateway_spec("gw1", "sw1", "eth0"))
        .unwrap_err();
    assert!(matches!(err.compensation(), Some(Compensation::Failed(_))));
    // The orphan is still there for an operator to clean up.
    assert_eq!(h.store.list_gateways().unwrap().len(), 1);
}

#[test]
fn test_update_postcommit_failure_keeps_change() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.driver
        .fail_on("update_l2_gateway_postcommit", rejected("update_l2_gateway_postcommit"));

    let update = GatewayUpdate {
        name: Some("renamed".to_string()),
        devices: None,
    };
    let err = h.plugin.update_gateway(&tenant(), &gw.id, &update).unwrap_err();
    assert!(err.is_driver_error());
    assert_eq!(err.compensation(), Some(&Compensation::NotAttempted));

    let stored = h.store.get_gateway(&gw.id).unwrap().unwrap();
    assert_eq!(stored.name, "renamed");
    JournalVerifier::new(&h.driver)
        .assert_tx_depth("update_l2_gateway_precommit", 1)
        .unwrap();
}

#[test]
fn test_delete_postcommit_failure_does_not_undelete() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.driver
        .fail_on("delete_l2_gateway_postcommit", rejected("delete_l2_gateway_postcommit"));

    let err = h.plugin.delete_gateway(&tenant(), &gw.id).unwrap_err();
    assert!(err.is_driver_error());
    assert!(h.store.get_gateway(&gw.id).unwrap().is_none());
    assert_eq!(h.plugin.stats().gateways_deleted, 1);
}

#[test]
fn test_delete_precommit_failure_keeps_gateway() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.driver
        .fail_on("delete_l2_gateway_precommit", rejected("delete_l2_gateway_precommit"));

    assert!(h.plugin.delete_gateway(&tenant(), &gw.id).is_err());
    assert!(h.store.get_gateway(&gw.id).unwrap().is_some());
    JournalVerifier::new(&h.driver)
        .assert_not_called("delete_l2_gateway_postcommit")
        .unwrap();
}

#[test]
fn test_gateway_with_connections_cannot_be_deleted() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.connection(&gw, "net1", Some(100));
    h.driver.clear();

    let err = h.plugin.delete_gateway(&tenant(), &gw.id).unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::GatewayInUse { .. })
    ));
    assert!(h.driver.calls().is_empty());
}

#[test]
fn test_gateway_with_remote_connections_cannot_be_deleted() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    let rgw = h.remote_gateway("peer", "192.0.2.10");
    let remote = h
        .plugin
        .create_remote_gateway_connection(
            &tenant(),
            &remote_connection_spec(gw.id, "net1", rgw.id, "100", None),
        )
        .unwrap();
    h.driver.clear();

    let err = h.plugin.delete_gateway(&tenant(), &gw.id).unwrap_err();
    assert!(matches!(
        err,
        PluginError::Validation(ValidationError::GatewayInUse { .. })
    ));
    assert!(h.driver.calls().is_empty());
    assert!(h.store.get_gateway(&gw.id).unwrap().is_some());

    h.plugin
        .delete_remote_gateway_connection(&tenant(), &remote.id, false)
        .unwrap();
    h.plugin.delete_gateway(&tenant(), &gw.id).unwrap();
    assert!(h.store.get_gateway(&gw.id).unwrap().is_none());
}

#[test]
fn test_connection_workflow() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.driver.clear();

    let conn = h.connection(&gw, "net1", Some(100));
    assert_eq!(conn.segmentation_id.map(|s| s.as_u16()), Some(100));
    assert_eq!(
        h.driver.operations(),
        vec![
            "create_l2_gateway_connection",
            "create_l2_gateway_connection_precommit",
            "create_l2_gateway_connection_postcommit"
        ]
    );
    JournalVerifier::new(&h.driver)
        .assert_tx_depth("create_l2_gateway_connection_precommit", 1)
        .unwrap();

    let dup = h
        .plugin
        .create_gateway_connection(&tenant(), &connection_spec(gw.id, "net1", None))
        .unwrap_err();
    assert!(matches!(
        dup,
        PluginError::Validation(ValidationError::DuplicateConnection { .. })
    ));

    h.plugin.delete_gateway_connection(&tenant(), &conn.id).unwrap();
    assert!(h.store.get_gateway_connection(&conn.id).unwrap().is_none());
    JournalVerifier::new(&h.driver)
        .assert_sequence(&[
            "delete_l2_gateway_connection",
            "delete_l2_gateway_connection_precommit",
            "delete_l2_gateway_connection_postcommit",
        ])
        .unwrap();
}

#[test]
fn test_connection_create_postcommit_failure_leaves_no_orphan() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.driver.fail_once(
        "create_l2_gateway_connection_postcommit",
        rejected("create_l2_gateway_connection_postcommit"),
    );

    let err = h
        .plugin
        .create_gateway_connection(&tenant(), &connection_spec(gw.id, "net1", None))
        .unwrap_err();
    assert_eq!(err.compensation(), Some(&Compensation::Deleted));
    assert!(h.store.connections_by_gateway(&gw.id).unwrap().is_empty());

    // The pair is free again.
    h.connection(&gw, "net1", None);
}

#[test]
fn test_connection_to_unknown_network_rejected() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");

    let err = h
        .plugin
        .create_gateway_connection(&tenant(), &connection_spec(gw.id, "net-missing", None))
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[test]
fn test_quiet_connection_delete_skips_driver() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    let conn = h.connection(&gw, "net1", None);
    h.driver.clear();

    h.plugin.delete_gateway_connection_quiet(&tenant(), &conn.id).unwrap();
    assert!(h.driver.calls().is_empty());
    assert!(h.store.get_gateway_connection(&conn.id).unwrap().is_none());
}

#[test]
fn test_get_and_list() {
    let h = Harness::new();
    let gw = h.gateway("gw1", "sw1");
    h.gateway("gw2", "sw2");
    let conn = h.connection(&gw, "net2", None);

    assert_eq!(h.plugin.get_gateway(&tenant(), &gw.id).unwrap(), gw);
    assert_eq!(h.plugin.list_gateways(&tenant()).unwrap().len(), 2);
    assert_eq!(h.plugin.get_gateway_connection(&tenant(), &conn.id).unwrap(), conn);
    assert_eq!(h.plugin.list_gateway_connections(&tenant()).unwrap().len(), 1);

    let missing = h.plugin.get_gateway(&tenant(), &l2gw_types::GatewayId::new_v4());
    assert!(missing.unwrap_err().is_not_found());
}
