//! In-memory [`L2gwStore`] with savepoint-based nested transactions.

use crate::error::{DbError, DbResult};
use crate::models::*;
use crate::store::L2gwStore;
use l2gw_types::{
    DeviceId, GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteGatewayId,
    RemoteMacId,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::thread::{self, ThreadId};
use tracing::{debug, info};
use uuid::Uuid;

/// Every table held by a [`MemoryStore`].
///
/// Also the on-disk snapshot format, written as pretty JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub gateways: BTreeMap<GatewayId, Gateway>,
    pub gateway_connections: BTreeMap<GatewayConnectionId, GatewayConnection>,
    pub networks: BTreeMap<String, Network>,
    pub remote_gateways: BTreeMap<RemoteGatewayId, RemoteGateway>,
    pub remote_gateway_connections: BTreeMap<RemoteGatewayConnectionId, RemoteGatewayConnection>,
    pub remote_macs: BTreeMap<RemoteMacId, RemoteMac>,
    pub logical_switches: BTreeMap<Uuid, LogicalSwitch>,
    pub physical_locators: BTreeMap<Uuid, PhysicalLocator>,
    pub ucast_macs_remote: BTreeMap<Uuid, UcastMacRemote>,
    pub physical_switches: BTreeMap<Uuid, PhysicalSwitch>,
    pub physical_ports: BTreeMap<Uuid, PhysicalPort>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: StoreSnapshot,
    /// Table state captured by each open `begin()`, innermost last.
    savepoints: Vec<StoreSnapshot>,
    /// Thread that opened the outermost transaction.
    owner: Option<ThreadId>,
}

impl Inner {
    fn owned_by_other(&self, me: ThreadId) -> bool {
        self.owner.is_some_and(|owner| owner != me)
    }
}

/// Mutex-guarded in-memory store.
///
/// Each `begin()` clones the current tables onto a savepoint stack;
/// `rollback()` restores the clone and `commit()` discards it.
///
/// An open transaction belongs to the thread that opened it. Any other
/// thread touching the store blocks until the outermost scope commits or
/// rolls back, so concurrent requests never share a savepoint stack or see
/// each other's uncommitted writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    released: Condvar,
}

fn build_devices(specs: &[DeviceSpec]) -> Vec<Device> {
    specs
        .iter()
        .map(|spec| Device {
            id: DeviceId::new_v4(),
            device_name: spec.device_name.clone(),
            interfaces: spec
                .interfaces
                .iter()
                .map(|i| DeviceInterface {
                    name: i.name.clone(),
                    segmentation_id: i.segmentation_id,
                })
                .collect(),
        })
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated from `snapshot`.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tables: snapshot,
                savepoints: Vec::new(),
                owner: None,
            }),
            released: Condvar::new(),
        }
    }

    /// Returns a copy of the current (possibly uncommitted) tables.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().tables.clone()
    }

    /// Replaces every table and drops any open savepoints.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut inner = self.lock();
        inner.tables = snapshot;
        inner.savepoints.clear();
        self.release(&mut inner);
    }

    /// Loads a store from a JSON snapshot; a missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting empty");
            return Ok(Self::new());
        }

        let raw = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&raw).map_err(|e| DbError::Snapshot(e.to_string()))?;
        info!(
            path = %path.display(),
            gateways = snapshot.gateways.len(),
            remote_connections = snapshot.remote_gateway_connections.len(),
            "Loaded state"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the current tables to `path` as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let raw =
            serde_json::to_string_pretty(&snapshot).map_err(|e| DbError::Snapshot(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, raw)?;
        debug!(path = %path.display(), "Saved state");
        Ok(())
    }

    /// Locks the tables once no other thread holds an open transaction.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        let me = thread::current().id();
        let mut inner = self.inner.lock();
        while inner.owned_by_other(me) {
            self.released.wait(&mut inner);
        }
        inner
    }

    fn release(&self, inner: &mut Inner) {
        if inner.savepoints.is_empty() {
            inner.owner = None;
            self.released.notify_all();
        }
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> DbResult<T>) -> DbResult<T> {
        let mut inner = self.lock();
        f(&mut inner.tables)
    }

    fn read<T>(&self, f: impl FnOnce(&StoreSnapshot) -> T) -> DbResult<T> {
        let inner = self.lock();
        Ok(f(&inner.tables))
    }
}

impl L2gwStore for MemoryStore {
    fn begin(&self) -> DbResult<()> {
        let mut inner = self.lock();
        inner.owner = Some(thread::current().id());
        let saved = inner.tables.clone();
        inner.savepoints.push(saved);
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        let mut inner = self.lock();
        inner.savepoints.pop().ok_or(DbError::NoTransaction)?;
        self.release(&mut inner);
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        let mut inner = self.lock();
        let saved = inner.savepoints.pop().ok_or(DbError::NoTransaction)?;
        inner.tables = saved;
        self.release(&mut inner);
        Ok(())
    }

    /// Depth of the calling thread's open scopes; zero for any other thread.
    fn transaction_depth(&self) -> usize {
        let inner = self.inner.lock();
        if inner.owner == Some(thread::current().id()) {
            inner.savepoints.len()
        } else {
            0
        }
    }

    // ------------------------------------------------------------------
    // Gateways
    // ------------------------------------------------------------------

    fn create_gateway(&self, tenant_id: &str, spec: &GatewaySpec) -> DbResult<Gateway> {
        let gateway = Gateway {
            id: GatewayId::new_v4(),
            name: spec.name.clone(),
            tenant_id: tenant_id.to_string(),
            devices: build_devices(&spec.devices),
        };
        self.with_tables(|t| {
            t.gateways.insert(gateway.id, gateway.clone());
            Ok(gateway)
        })
    }

    fn get_gateway(&self, id: &GatewayId) -> DbResult<Option<Gateway>> {
        self.read(|t| t.gateways.get(id).cloned())
    }

    fn list_gateways(&self) -> DbResult<Vec<Gateway>> {
        self.read(|t| t.gateways.values().cloned().collect())
    }

    fn update_gateway(&self, id: &GatewayId, update: &GatewayUpdate) -> DbResult<Gateway> {
        self.with_tables(|t| {
            let gateway = t
                .gateways
                .get_mut(id)
                .ok_or_else(|| DbError::not_found("gateway", id))?;
            if let Some(name) = &update.name {
                gateway.name = name.clone();
            }
            if let Some(devices) = &update.devices {
                gateway.devices = build_devices(devices);
            }
            Ok(gateway.clone())
        })
    }

    fn delete_gateway(&self, id: &GatewayId) -> DbResult<()> {
        self.with_tables(|t| {
            t.gateways
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| DbError::not_found("gateway", id))
        })
    }

    // ------------------------------------------------------------------
    // Gateway connections
    // ------------------------------------------------------------------

    fn create_gateway_connection(
        &self,
        tenant_id: &str,
        spec: &GatewayConnectionSpec,
    ) -> DbResult<GatewayConnection> {
        self.with_tables(|t| {
            if !t.gateways.contains_key(&spec.gateway_id) {
                return Err(DbError::not_found("gateway", spec.gateway_id));
            }
            let exists = t
                .gateway_connections
                .values()
                .any(|c| c.gateway_id == spec.gateway_id && c.network_id == spec.network_id);
            if exists {
                return Err(DbError::duplicate(
                    "gateway connection",
                    format!("{}/{}", spec.gateway_id, spec.network_id),
                ));
            }

            let connection = GatewayConnection {
                id: GatewayConnectionId::new_v4(),
                gateway_id: spec.gateway_id,
                network_id: spec.network_id.clone(),
                segmentation_id: spec.segmentation_id,
                tenant_id: tenant_id.to_string(),
            };
            t.gateway_connections
                .insert(connection.id, connection.clone());
            Ok(connection)
        })
    }

    fn get_gateway_connection(
        &self,
        id: &GatewayConnectionId,
    ) -> DbResult<Option<GatewayConnection>> {
        self.read(|t| t.gateway_connections.get(id).cloned())
    }

    fn list_gateway_connections(&self) -> DbResult<Vec<GatewayConnection>> {
        self.read(|t| t.gateway_connections.values().cloned().collect())
    }

    fn delete_gateway_connection(&self, id: &GatewayConnectionId) -> DbResult<()> {
        self.with_tables(|t| {
            t.gateway_connections
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| DbError::not_found("gateway connection", id))
        })
    }

    fn connections_by_gateway(&self, gateway_id: &GatewayId) -> DbResult<Vec<GatewayConnection>> {
        self.read(|t| {
            t.gateway_connections
                .values()
                .filter(|c| &c.gateway_id == gateway_id)
                .cloned()
                .collect()
        })
    }

    fn connection_by_gateway_and_network(
        &self,
        gateway_id: &GatewayId,
        network_id: &str,
    ) -> DbResult<Option<GatewayConnection>> {
        self.read(|t| {
            t.gateway_connections
                .values()
                .find(|c| &c.gateway_id == gateway_id && c.network_id == network_id)
                .cloned()
        })
    }

    fn network_exists(&self, network_id: &str) -> DbResult<bool> {
        self.read(|t| t.networks.contains_key(network_id))
    }

    fn register_network(&self, network: Network) -> DbResult<()> {
        self.with_tables(|t| {
            t.networks.insert(network.id.clone(), network);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Remote gateways
    // ------------------------------------------------------------------

    fn create_remote_gateway(
        &self,
        tenant_id: &str,
        spec: &RemoteGatewaySpec,
    ) -> DbResult<RemoteGateway> {
        let remote = RemoteGateway {
            id: RemoteGatewayId::new_v4(),
            name: spec.name.clone(),
            ipaddr: spec.ipaddr,
            tenant_id: tenant_id.to_string(),
        };
        self.with_tables(|t| {
            t.remote_gateways.insert(remote.id, remote.clone());
            Ok(remote)
        })
    }

    fn get_remote_gateway(&self, id: &RemoteGatewayId) -> DbResult<Option<RemoteGateway>> {
        self.read(|t| t.remote_gateways.get(id).cloned())
    }

    fn list_remote_gateways(&self) -> DbResult<Vec<RemoteGateway>> {
        self.read(|t| t.remote_gateways.values().cloned().collect())
    }

    fn update_remote_gateway(
        &self,
        id: &RemoteGatewayId,
        update: &RemoteGatewayUpdate,
    ) -> DbResult<RemoteGateway> {
        self.with_tables(|t| {
            let remote = t
                .remote_gateways
                .get_mut(id)
                .ok_or_else(|| DbError::not_found("remote gateway", id))?;
            if let Some(name) = &update.name {
                remote.name = name.clone();
            }
            if let Some(ipaddr) = update.ipaddr {
                remote.ipaddr = ipaddr;
            }
            Ok(remote.clone())
        })
    }

    fn delete_remote_gateway(&self, id: &RemoteGatewayId) -> DbResult<()> {
        self.with_tables(|t| {
            t.remote_gateways
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| DbError::not_found("remote gateway", id))
        })
    }

    // ------------------------------------------------------------------
    // Remote gateway connections
    // ------------------------------------------------------------------

    fn create_remote_gateway_connection(
        &self,
        tenant_id: &str,
        spec: &RemoteGatewayConnectionSpec,
        seg_id: u32,
    ) -> DbResult<RemoteGatewayConnection> {
        let connection = RemoteGatewayConnection {
            id: RemoteGatewayConnectionId::new_v4(),
            gateway: spec.gateway,
            network: spec.network.clone(),
            remote_gateway: spec.remote_gateway,
            seg_id,
            flood: spec.flood,
            tenant_id: tenant_id.to_string(),
        };
        self.with_tables(|t| {
            if !t.remote_gateways.contains_key(&spec.remote_gateway) {
                return Err(DbError::not_found("remote gateway", spec.remote_gateway));
            }
            t.remote_gateway_connections
                .insert(connection.id, connection.clone());
            Ok(connection)
        })
    }

    fn get_remote_gateway_connection(
        &self,
        id: &RemoteGatewayConnectionId,
    ) -> DbResult<Option<RemoteGatewayConnection>> {
        self.read(|t| t.remote_gateway_connections.get(id).cloned())
    }

    fn list_remote_gateway_connections(&self) -> DbResult<Vec<RemoteGatewayConnection>> {
        self.read(|t| t.remote_gateway_connections.values().cloned().collect())
    }

    fn update_remote_gateway_connection(
        &self,
        id: &RemoteGatewayConnectionId,
        network: Option<&str>,
        seg_id: Option<u32>,
        flood: Option<bool>,
    ) -> DbResult<RemoteGatewayConnection> {
        self.with_tables(|t| {
            let connection = t
                .remote_gateway_connections
                .get_mut(id)
                .ok_or_else(|| DbError::not_found("remote gateway connection", id))?;
            if let Some(network) = network {
                connection.network = network.to_string();
            }
            if let Some(seg_id) = seg_id {
                connection.seg_id = seg_id;
            }
            if flood.is_some() {
                connection.flood = flood;
            }
            Ok(connection.clone())
        })
    }

    fn delete_remote_gateway_connection(&self, id: &RemoteGatewayConnectionId) -> DbResult<()> {
        self.with_tables(|t| {
            t.remote_gateway_connections
                .remove(id)
                .ok_or_else(|| DbError::not_found("remote gateway connection", id))?;
            // Remote MACs are owned by their connection.
            t.remote_macs.retain(|_, m| &m.rgw_connection != id);
            Ok(())
        })
    }

    fn remote_connections_by_gateway(
        &self,
        gateway_id: &GatewayId,
    ) -> DbResult<Vec<RemoteGatewayConnection>> {
        self.read(|t| {
            t.remote_gateway_connections
                .values()
                .filter(|c| &c.gateway == gateway_id)
                .cloned()
                .collect()
        })
    }

    fn remote_connections_by_remote_gateway(
        &self,
        remote_gateway_id: &RemoteGatewayId,
    ) -> DbResult<Vec<RemoteGatewayConnection>> {
        self.read(|t| {
            t.remote_gateway_connections
                .values()
                .filter(|c| &c.remote_gateway == remote_gateway_id)
                .cloned()
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // Remote MACs
    // ------------------------------------------------------------------

    fn create_remote_mac(&self, tenant_id: &str, spec: &RemoteMacSpec) -> DbResult<RemoteMac> {
        let mac = RemoteMac {
            id: RemoteMacId::new_v4(),
            mac: spec.mac,
            ipaddr: spec.ipaddr,
            rgw_connection: spec.rgw_connection,
            tenant_id: tenant_id.to_string(),
        };
        self.with_tables(|t| {
            if !t.remote_gateway_connections.contains_key(&spec.rgw_connection) {
                return Err(DbError::not_found(
                    "remote gateway connection",
                    spec.rgw_connection,
                ));
            }
            t.remote_macs.insert(mac.id, mac.clone());
            Ok(mac)
        })
    }

    fn get_remote_mac(&self, id: &RemoteMacId) -> DbResult<Option<RemoteMac>> {
        self.read(|t| t.remote_macs.get(id).cloned())
    }

    fn list_remote_macs(&self) -> DbResult<Vec<RemoteMac>> {
        self.read(|t| t.remote_macs.values().cloned().collect())
    }

    fn delete_remote_mac(&self, id: &RemoteMacId) -> DbResult<()> {
        self.with_tables(|t| {
            t.remote_macs
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| DbError::not_found("remote mac", id))
        })
    }

    fn remote_macs_by_connection(
        &self,
        rgw_connection: &RemoteGatewayConnectionId,
    ) -> DbResult<Vec<RemoteMac>> {
        self.read(|t| {
            t.remote_macs
                .values()
                .filter(|m| &m.rgw_connection == rgw_connection)
                .cloned()
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // OVSDB mirror lookups
    // ------------------------------------------------------------------

    fn logical_switch_by_name(&self, name: &str) -> DbResult<Option<LogicalSwitch>> {
        self.read(|t| t.logical_switches.values().find(|s| s.name == name).cloned())
    }

    fn physical_locator_by_ip_and_key(
        &self,
        dst_ip: &IpAddr,
        key: u32,
    ) -> DbResult<Option<PhysicalLocator>> {
        self.read(|t| {
            t.physical_locators
                .values()
                .find(|l| &l.dst_ip == dst_ip && l.key == key)
                .cloned()
        })
    }

    fn ucast_mac_remote_by_id(&self, uuid: &Uuid) -> DbResult<Option<UcastMacRemote>> {
        self.read(|t| t.ucast_macs_remote.get(uuid).cloned())
    }

    fn unused_device(&self, exclude_ovsdb: &str) -> DbResult<Option<PhysicalSwitch>> {
        self.read(|t| {
            let mut candidates: Vec<&PhysicalSwitch> = t
                .physical_switches
                .values()
                .filter(|s| s.ovsdb_identifier != exclude_ovsdb)
                .filter(|s| {
                    !t.gateways
                        .values()
                        .any(|g| g.device_names().any(|name| name == s.name))
                })
                .collect();
            candidates.sort_by(|a, b| a.name.cmp(&b.name));
            candidates.first().map(|s| (*s).clone())
        })
    }

    fn device_by_name(&self, device_name: &str) -> DbResult<Option<DeviceBinding>> {
        self.read(|t| {
            t.gateways.values().find_map(|g| {
                g.devices
                    .iter()
                    .find(|d| d.device_name == device_name)
                    .map(|d| DeviceBinding {
                        gateway_id: g.id,
                        device: d.clone(),
                    })
            })
        })
    }

    fn device_interface(&self, switch_uuid: &Uuid) -> DbResult<Option<PhysicalPort>> {
        self.read(|t| {
            t.physical_ports
                .values()
                .filter(|p| &p.physical_switch_id == switch_uuid)
                .min_by(|a, b| a.name.cmp(&b.name))
                .cloned()
        })
    }

    fn physical_switches_by_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<Vec<PhysicalSwitch>> {
        self.read(|t| {
            t.physical_switches
                .values()
                .filter(|s| s.ovsdb_identifier == ovsdb_identifier)
                .cloned()
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // OVSDB mirror maintenance
    // ------------------------------------------------------------------

    fn delete_logical_switch_by_name(&self, name: &str, ovsdb_identifier: &str) -> DbResult<()> {
        self.with_tables(|t| {
            t.logical_switches
                .retain(|_, s| !(s.name == name && s.ovsdb_identifier == ovsdb_identifier));
            Ok(())
        })
    }

    fn delete_physical_locators_for_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<()> {
        self.with_tables(|t| {
            t.physical_locators
                .retain(|_, l| l.ovsdb_identifier != ovsdb_identifier);
            Ok(())
        })
    }

    fn delete_macs_for_ovsdb(&self, ovsdb_identifier: &str) -> DbResult<()> {
        self.with_tables(|t| {
            t.ucast_macs_remote
                .retain(|_, m| m.ovsdb_identifier != ovsdb_identifier);
            Ok(())
        })
    }

    fn upsert_logical_switch(&self, record: LogicalSwitch) -> DbResult<()> {
        self.with_tables(|t| {
            t.logical_switches.insert(record.uuid, record);
            Ok(())
        })
    }

    fn upsert_physical_locator(&self, record: PhysicalLocator) -> DbResult<()> {
        self.with_tables(|t| {
            t.physical_locators.insert(record.uuid, record);
            Ok(())
        })
    }

    fn upsert_ucast_mac_remote(&self, record: UcastMacRemote) -> DbResult<()> {
        self.with_tables(|t| {
            t.ucast_macs_remote.insert(record.uuid, record);
            Ok(())
        })
    }

    fn upsert_physical_switch(&self, record: PhysicalSwitch) -> DbResult<()> {
        self.with_tables(|t| {
            t.physical_switches.insert(record.uuid, record);
            Ok(())
        })
    }

    fn upsert_physical_port(&self, record: PhysicalPort) -> DbResult<()> {
        self.with_tables(|t| {
            t.physical_ports.insert(record.uuid, record);
            Ok(())
        })
    }
}
