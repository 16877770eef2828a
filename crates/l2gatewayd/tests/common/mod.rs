//! Shared harness for the orchestration integration tests.

#![allow(dead_code)]

use l2gatewayd::L2GatewayPlugin;
use l2gw_db::{Gateway, GatewayConnection, L2gwStore, MemoryStore, RemoteGateway};
use l2gw_driver::{DriverError, DriverRegistry};
use l2gw_test::{
    connection_spec, gateway_spec, remote_gateway_spec, seeded_store, RecordingDriver, TENANT,
};
use l2gw_types::RequestContext;
use std::sync::Arc;

/// Plugin wired to a seeded memory store and a recording driver that
/// notes the store's transaction depth on every call.
pub struct Harness {
    pub plugin: L2GatewayPlugin,
    pub store: Arc<MemoryStore>,
    pub driver: Arc<RecordingDriver>,
}

impl Harness {
    pub fn new() -> Self {
        let store = seeded_store();
        let dyn_store: Arc<dyn L2gwStore> = store.clone();
        let driver = Arc::new(RecordingDriver::with_store(dyn_store.clone()));
        let plugin = L2GatewayPlugin::new(dyn_store, DriverRegistry::single("l2gw", driver.clone()));
        Self {
            plugin,
            store,
            driver,
        }
    }

    pub fn gateway(&self, name: &str, device: &str) -> Gateway {
        self.plugin
            .create_gateway(&tenant(), &gateway_spec(name, device, "eth0"))
            .expect("create gateway")
    }

    pub fn connection(&self, gateway: &Gateway, network: &str, seg: Option<u16>) -> GatewayConnection {
        self.plugin
            .create_gateway_connection(&tenant(), &connection_spec(gateway.id, network, seg))
            .expect("create connection")
    }

    pub fn remote_gateway(&self, name: &str, ip: &str) -> RemoteGateway {
        self.plugin
            .create_remote_gateway(&tenant(), &remote_gateway_spec(name, ip))
            .expect("create remote gateway")
    }
}

pub fn tenant() -> RequestContext {
    RequestContext::tenant(TENANT)
}

pub fn admin() -> RequestContext {
    RequestContext::admin(TENANT)
}

pub fn rejected(operation: &str) -> DriverError {
    DriverError::rejected(operation, "switch refused")
}
