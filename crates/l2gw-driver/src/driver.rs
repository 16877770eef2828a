//! The southbound service driver interface.

use crate::error::DriverResult;
use crate::payload::{PortMac, RemoteUnknown, UcastMacRemote};
use l2gw_db::{Gateway, GatewayConnection, GatewayConnectionSpec, GatewaySpec, GatewayUpdate};
use l2gw_types::{GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteMacId, RequestContext};

/// Operations the orchestration core invokes on the active driver.
///
/// Gateway and gateway-connection lifecycles are split into three hooks:
///
/// 1. the bare operation (e.g. `create_l2_gateway`) runs before any write
///    and receives the raw request
/// 2. `*_precommit` runs inside the open transaction with the persisted
///    instance; an error rolls the write back
/// 3. `*_postcommit` runs after commit
///
/// The lifecycle hooks default to accepting the call. Port, remote and MAC
/// operations have no default.
///
/// # Thread Safety
///
/// Drivers are shared behind an `Arc` and must be `Send + Sync`.
pub trait ServiceDriver: Send + Sync {
    /// Driver name used in logs.
    fn name(&self) -> &str;

    fn add_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> DriverResult<()>;

    fn delete_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> DriverResult<()>;

    // ------------------------------------------------------------------
    // Gateway lifecycle
    // ------------------------------------------------------------------

    fn create_l2_gateway(&self, _ctx: &RequestContext, _spec: &GatewaySpec) -> DriverResult<()> {
        Ok(())
    }

    fn create_l2_gateway_precommit(
        &self,
        _ctx: &RequestContext,
        _gateway: &Gateway,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn create_l2_gateway_postcommit(
        &self,
        _ctx: &RequestContext,
        _gateway: &Gateway,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn update_l2_gateway(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayId,
        _update: &GatewayUpdate,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn update_l2_gateway_precommit(
        &self,
        _ctx: &RequestContext,
        _gateway: &Gateway,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn update_l2_gateway_postcommit(
        &self,
        _ctx: &RequestContext,
        _gateway: &Gateway,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway(&self, _ctx: &RequestContext, _id: &GatewayId) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway_precommit(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayId,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway_postcommit(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayId,
    ) -> DriverResult<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Gateway connection lifecycle
    // ------------------------------------------------------------------

    fn create_l2_gateway_connection(
        &self,
        _ctx: &RequestContext,
        _spec: &GatewayConnectionSpec,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn create_l2_gateway_connection_precommit(
        &self,
        _ctx: &RequestContext,
        _connection: &GatewayConnection,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn create_l2_gateway_connection_postcommit(
        &self,
        _ctx: &RequestContext,
        _connection: &GatewayConnection,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway_connection(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway_connection_precommit(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        Ok(())
    }

    fn delete_l2_gateway_connection_postcommit(
        &self,
        _ctx: &RequestContext,
        _id: &GatewayConnectionId,
    ) -> DriverResult<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote connections and MACs
    // ------------------------------------------------------------------

    fn create_remote_unknown(
        &self,
        ctx: &RequestContext,
        payload: &RemoteUnknown,
    ) -> DriverResult<()>;

    fn delete_l2_remote_gateway_connection(
        &self,
        ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
    ) -> DriverResult<()>;

    fn add_ucast_mac_remote(&self, ctx: &RequestContext, mac: &UcastMacRemote)
        -> DriverResult<()>;

    /// Removes a unicast MAC entry from the OVSDB server `ovsdb_identifier`.
    fn del_ucast_mac_remote(
        &self,
        ctx: &RequestContext,
        ovsdb_identifier: &str,
        id: &RemoteMacId,
    ) -> DriverResult<()>;
}
