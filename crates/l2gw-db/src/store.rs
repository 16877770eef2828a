//! The persistence interface consumed by the orchestration core.

use crate::error::DbResult;
use crate::models::*;
use l2gw_types::{
    GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteGatewayId, RemoteMacId,
};
use std::net::IpAddr;
use uuid::Uuid;

/// Transactional store for gateway entities and the OVSDB mirror tables.
///
/// # Transactions
///
/// `begin()` opens a scope that may nest inside an already open one
/// (a "subtransaction"). Each scope is closed by exactly one `commit()` or
/// `rollback()`:
///
/// - `rollback()` discards every write made since the matching `begin()`,
///   including writes of inner scopes that already committed.
/// - `commit()` of an inner scope folds its writes into the enclosing scope;
///   they become durable only when the outermost scope commits.
///
/// Writes issued with no scope open are applied immediately.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; isolation between concurrent
/// callers is whatever the implementation provides.
pub trait L2gwStore: Send + Sync {
    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    fn begin(&self) -> DbResult<()>;

    fn commit(&self) -> DbResult<()>;

    fn rollback(&self) -> DbResult<()>;

    /// Number of open transaction scopes.
    fn transaction_depth(&self) -> usize;

    // ------------------------------------------------------------------
    // Gateways
    // ------------------------------------------------------------------

    fn create_gateway(&self, tenant_id: &str, spec: &GatewaySpec) -> DbResult<Gateway>;

    fn get_gateway(&self, id: &GatewayId) -> DbResult<Option<Gateway>>;

    fn list_gateways(&self) -> DbResult<Vec<Gateway>>;

    fn update_gateway(&self, id: &GatewayId, update: &GatewayUpdate) -> DbResult<Gateway>;

    fn delete_gateway(&self, id: &GatewayId) -> DbResult<()>;

    // ------------------------------------------------------------------
    // Gateway connections
    // ------------------------------------------------------------------

    fn create_gateway_connection(
        &self,
        tenant_id: &str,
        spec: &GatewayConnectionSpec,
    ) -> DbResult<GatewayConnection>;

    fn get_gateway_connection(&self, id: &GatewayConnectionId)
        -> DbResult<Option<GatewayConnection>>;

    fn list_gateway_connections(&self) -> DbResult<Vec<GatewayConnection>>;

    fn delete_gateway_connection(&self, id: &GatewayConnectionId) -> DbResult<()>;

    fn connections_by_gateway(&self, gateway_id: &GatewayId) -> DbResult<Vec<GatewayConnection>>;

    fn connection_by_gateway_and_network(
        &self,
        gateway_id: &GatewayId,
        network_id: &str,
    ) -> DbResult<Option<GatewayConnection>>;

    fn network_exists(&self, network_id: &str) -> DbResult<bool>;

    fn register_network(&self, network: Network) -> DbResult<()>;

    // ------------------------------------------------------------------
    // Remote gateways and their connections
    // ------------------------------------------------------------------

    fn create_remote_gateway(
        &self,
        tenant_id: &str,
        spec: &RemoteGatewaySpec,
    ) -> DbResult<RemoteGateway>;

    fn get_remote_gateway(&self, id: &RemoteGatewayId) -> DbResult<Option<RemoteGateway>>;

    fn list_remote_gateways(&self) -> DbResult<Vec<RemoteGateway>>;

    fn update_remote_gateway(
        &self,
        id: &RemoteGatewayId,
        update: &RemoteGatewayUpdate,
    ) -> DbResult<RemoteGateway>;

    fn delete_remote_gateway(&self, id: &RemoteGatewayId) -> DbResult<()>;

    /// Persists a remote connection whose `seg_id` has already been parsed.
    fn create_remote_gateway_connection(
        &self,
        tenant_id: &str,
        spec: &RemoteGatewayConnectionSpec,
        seg_id: u32,
    ) -> DbResult<RemoteGatewayConnection>;

    fn get_remote_gateway_connection(
        &self,
        id: &RemoteGatewayConnectionId,
    ) -> DbResult<Option<RemoteGatewayConnection>>;

    fn list_remote_gateway_connections(&self) -> DbResult<Vec<RemoteGatewayConnection>>;

    fn update_remote_gateway_connection(
        &self,
        id: &RemoteGatewayConnectionId,
        network: Option<&str>,
        seg_id: Option<u32>,
        flood: Option<bool>,
    ) -> DbResult<RemoteGatewayConnection>;

    fn delete_remote_gateway_connection(&self, id: &RemoteGatewayConnectionId) -> DbResult<()>;

    fn remote_connections_by_gateway(
        &self,
        gateway_id: &GatewayId,
    ) -> DbResult<Vec<RemoteGatewayConnection>>;

    fn remote_connections_by_remote_gateway(
        &self,
        remote_gateway_id: &RemoteGatewayId,
    ) -> DbResult<Vec<RemoteGatewayConnection>>;

    // ------------------------------------------------------------------
    // Remote MACs
    // ------------------------------------------------------------------

    fn create_remote_mac(&self, tenant_id: &str, spec: &RemoteMacSpec) -> DbResult<RemoteMac>;

    fn get_remote_mac(&self, id: &RemoteMacId) -> DbResult<Option<RemoteMac>>;

    fn list_remote_macs(&self) -> DbResult<Vec<RemoteMac>>;

    fn delete_remote_mac(&self, id: &RemoteMacId) -> DbResult<()>;

    fn remote_macs_by_connection(
        &self,
        rgw_connection: &RemoteGatewayConnectionId,
    ) -> DbResult<Vec<RemoteMac>>;

    // ------------------------------------------------------------------
    // OVSDB mirror lookups
    // ------------------------------------------------------------------

    fn logical_switch_by_name(&self, name: &str) -> DbResult<Option<LogicalSwitch>>;

    fn physical_locator_by_ip_and_key(
        &self,
        dst_ip: &IpAddr,
        key: u32,
    ) -> DbResult<Option<PhysicalLocator>>;

    fn ucast_mac_remote_by_id(&self, uuid: &Uuid) -> DbResult<Option<UcastMacRemote>>;

    /// First physical switch, by name, that no gateway device refers to,
    /// skipping switches managed by `exclude_ovsdb`.
    fn unused_device(&self, exclude_ovsdb: &str) -> DbResult<Option<PhysicalSwitch>>;

    fn device_by_name(&self, device_name: &str) -> DbResult<Option<DeviceBinding>>;

    /// First port, by name, of the given physical switch.
    fn device_interface(&self, switch_uuid: &Uuid) -> DbResult<Option<PhysicalPort>>;

    fn physical_switches_by_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<Vec<PhysicalSwitch>>;

    // ------------------------------------------------------------------
    // OVSDB mirror maintenance
    // ------------------------------------------------------------------

    fn delete_logical_switch_by_name(&self, name: &str, ovsdb_identifier: &str) -> DbResult<()>;

    fn delete_physical_locators_for_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<()>;

    fn delete_macs_for_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<()>;

    fn upsert_logical_switch(&self, record: LogicalSwitch) -> DbResult<()>;

    fn upsert_physical_locator(&self, record: PhysicalLocator) -> DbResult<()>;

    fn upsert_ucast_mac_remote(&self, record: UcastMacRemote) -> DbResult<()>;

    fn upsert_physical_switch(&self, record: PhysicalSwitch) -> DbResult<()>;

    fn upsert_physical_port(&self, record: PhysicalPort) -> DbResult<()>;
}
