//! A [`ServiceDriver`] that journals every call and can be told to fail.

use l2gw_db::{
    Gateway, GatewayConnection, GatewayConnectionSpec, GatewaySpec, GatewayUpdate, L2gwStore,
};
use l2gw_driver::{DriverError, DriverResult, PortMac, RemoteUnknown, ServiceDriver, UcastMacRemote};
use l2gw_types::{
    GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteMacId, RequestContext,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One journaled driver call.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverCall {
    /// Operation name, e.g. `create_l2_gateway_postcommit`.
    pub operation: String,
    /// JSON rendering of the argument the driver received.
    pub payload: Value,
    /// Open transaction scopes at call time, when a store is attached.
    pub tx_depth: Option<usize>,
}

#[derive(Debug, Clone)]
struct Fault {
    error: DriverError,
    once: bool,
}

/// Recording driver for tests.
///
/// Every operation is appended to an in-memory journal before any injected
/// fault is returned, so a failing call is still visible in [`calls`].
///
/// [`calls`]: RecordingDriver::calls
#[derive(Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<DriverCall>>,
    faults: Mutex<HashMap<String, Fault>>,
    store: Option<Arc<dyn L2gwStore>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the store's transaction depth with each call.
    pub fn with_store(store: Arc<dyn L2gwStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Makes every call to `operation` fail with `error`.
    pub fn fail_on(&self, operation: &str, error: DriverError) {
        self.faults
            .lock()
            .insert(operation.to_string(), Fault { error, once: false });
    }

    /// Makes the next call to `operation` fail with `error`.
    pub fn fail_once(&self, operation: &str, error: DriverError) {
        self.faults
            .lock()
            .insert(operation.to_string(), Fault { error, once: true });
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.operation.clone()).collect()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<DriverCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.operation == operation).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, operation: &str, payload: Value) -> DriverResult<()> {
        let tx_depth = self.store.as_ref().map(|s| s.transaction_depth());
        debug!(operation, ?tx_depth, "driver call");
        self.calls.lock().push(DriverCall {
            operation: operation.to_string(),
            payload,
            tx_depth,
        });

        let mut faults = self.faults.lock();
        match faults.get(operation).cloned() {
            Some(fault) => {
                if fault.once {
                    faults.remove(operation);
                }
                Err(fault.error)
            }
            None => Ok(()),
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl ServiceDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn add_port_mac(&self, _ctx: &RequestContext, port: &PortMac) -> DriverResult<()> {
        self.record("add_port_mac", to_value(port))
    }

    fn delete_port_mac(&self, _ctx: &RequestContext, port: &PortMac) -> DriverResult<()> {
        self.record("delete_port_mac", to_value(port))
    }

    fn create_l2_gateway(&self, _ctx: &RequestContext, spec: &GatewaySpec) -> DriverResult<()> {
        self.record("create_l2_gateway", to_value(spec))
    }

    fn create_l2_gateway_precommit(&self, _ctx: &RequestContext, gateway: &Gateway) -> DriverResult<()> {
        self.record("create_l2_gateway_precommit", to_value(gateway))
    }

    fn create_l2_gateway_postcommit(&self, _ctx: &RequestContext, gateway: &Gateway) -> DriverResult<()> {
        self.record("create_l2_gateway_postcommit", to_value(gateway))
    }

    fn update_l2_gateway(
        &self,
        _ctx: &RequestContext,
        id: &GatewayId,
        update: &GatewayUpdate,
    ) -> DriverResult<()> {
        self.record(
            "update_l2_gateway",
            json!({ "id": id.to_string(), "update": to_value(update) }),
        )
    }

    fn update_l2_gateway_precommit(&self, _ctx: &RequestContext, gateway: &Gateway) -> DriverResult<()> {
        self.record("update_l2_gateway_precommit", to_value(gateway))
    }

    fn update_l2_gateway_postcommit(&self, _ctx: &RequestContext, gateway: &Gateway) -> DriverResult<()> {
        self.record("update_l2_gateway_postcommit", to_value(gateway))
    }

    fn delete_l2_gateway(&self, _ctx: &RequestContext, id: &GatewayId) -> DriverResult<()> {
        self.record("delete_l2_gateway", json!(id.to_string()))
    }

    fn delete_l2_gateway_precommit(&self, _ctx: &RequestContext, id: &GatewayId) -> DriverResult<()> {
        self.record("delete_l2_gateway_precommit", json!(id.to_string()))
    }

    fn delete_l2_gateway_postcommit(&self, _ctx: &RequestContext, id: &GatewayId) -> DriverResult<()> {
        self.record("delete_l2_gateway_postcommit", json!(id.to_string()))
    }

    fn create_l2_gateway_connection(
        &self,
        _ctx: &RequestContext,
        spec: &GatewayConnectionSpec,
    ) -> DriverResult<()> {
        self.record("create_l2_gateway_connection", to_value(spec))
    }

    fn create_l2_gateway_connection_precommit(
        &self,
        _ctx: &RequestContext,
        connection: &GatewayConnection,
    ) -> DriverResult<()> {
        self.record("create_l2_gateway_connection_precommit", to_value(connection))
    }

    fn create_l2_gateway_connection_postcommit(
        &self,
        _ctx: &RequestContext,
        connection: &GatewayConnection,
    ) -> DriverResult<()> {
        self.record("create_l2_gateway_connection_postcommit", to_value(connection))
    }

    fn delete_l2_gateway_connection(
        &self,
        _ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        self.record("delete_l2_gateway_connection", json!(id.to_string()))
    }

    fn delete_l2_gateway_connection_precommit(
        &self,
        _ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        self.record("delete_l2_gateway_connection_precommit", json!(id.to_string()))
    }

    fn delete_l2_gateway_connection_postcommit(
        &self,
        _ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        self.record("delete_l2_gateway_connection_postcommit", json!(id.to_string()))
    }

    fn create_remote_unknown(&self, _ctx: &RequestContext, payload: &RemoteUnknown) -> DriverResult<()> {
        self.record("create_remote_unknown", to_value(payload))
    }

    fn delete_l2_remote_gateway_connection(
        &self,
        _ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
    ) -> DriverResult<()> {
        self.record("delete_l2_remote_gateway_connection", json!(id.to_string()))
    }

    fn add_ucast_mac_remote(&self, _ctx: &RequestContext, mac: &UcastMacRemote) -> DriverResult<()> {
        self.record("add_ucast_mac_remote", to_value(mac))
    }

    fn del_ucast_mac_remote(
        &self,
        _ctx: &RequestContext,
        ovsdb_identifier: &str,
        id: &RemoteMacId,
    ) -> DriverResult<()> {
        self.record(
            "del_ucast_mac_remote",
            json!({ "ovsdb_identifier": ovsdb_identifier, "id": id.to_string() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2gw_db::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_journal_and_fail_once() {
        let driver = RecordingDriver::new();
        let ctx = RequestContext::admin("t1");
        let id = GatewayId::new_v4();

        driver.fail_once("delete_l2_gateway", DriverError::rejected("delete_l2_gateway", "busy"));
        assert!(driver.delete_l2_gateway(&ctx, &id).is_err());
        assert!(driver.delete_l2_gateway(&ctx, &id).is_ok());

        assert_eq!(driver.count("delete_l2_gateway"), 2);
        assert_eq!(driver.calls()[0].payload, json!(id.to_string()));
        assert_eq!(driver.calls()[0].tx_depth, None);
    }

    #[test]
    fn test_records_transaction_depth() {
        let store = Arc::new(MemoryStore::new());
        let driver = RecordingDriver::with_store(store.clone());
        let ctx = RequestContext::admin("t1");

        store.begin().unwrap();
        driver.delete_l2_gateway_precommit(&ctx, &GatewayId::new_v4()).unwrap();
        store.commit().unwrap();
        driver.delete_l2_gateway_postcommit(&ctx, &GatewayId::new_v4()).unwrap();

        let depths: Vec<_> = driver.calls().iter().map(|c| c.tx_depth).collect();
        assert_eq!(depths, vec![Some(1), Some(0)]);
    }
}
