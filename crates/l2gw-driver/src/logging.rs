//! Built-in driver that accepts every operation and logs it.

use crate::driver::ServiceDriver;
use crate::error::DriverResult;
use crate::payload::{PortMac, RemoteUnknown, UcastMacRemote};
use l2gw_db::{Gateway, GatewayConnection, GatewayConnectionSpec, GatewaySpec, GatewayUpdate};
use l2gw_types::{GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteMacId, RequestContext};
use tracing::info;

/// Driver path understood by the built-in factory.
pub const LOGGING_DRIVER: &str = "logging";

/// No-op southbound driver for standalone operation.
#[derive(Debug, Clone)]
pub struct LoggingDriver {
    provider: String,
}

impl LoggingDriver {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

impl ServiceDriver for LoggingDriver {
    fn name(&self) -> &str {
        &self.provider
    }

    fn add_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, port = %port.port_id, mac = %port.mac, "add_port_mac");
        Ok(())
    }

    fn delete_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, port = %port.port_id, mac = %port.mac, "delete_port_mac");
        Ok(())
    }

    fn create_l2_gateway(&self, ctx: &RequestContext, spec: &GatewaySpec) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, name = %spec.name, devices = spec.devices.len(), "create_l2_gateway");
        Ok(())
    }

    fn create_l2_gateway_postcommit(&self, ctx: &RequestContext, gateway: &Gateway) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, gateway = %gateway.id, "create_l2_gateway_postcommit");
        Ok(())
    }

    fn update_l2_gateway(&self, ctx: &RequestContext, id: &GatewayId, _update: &GatewayUpdate) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, gateway = %id, "update_l2_gateway");
        Ok(())
    }

    fn delete_l2_gateway(&self, ctx: &RequestContext, id: &GatewayId) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, gateway = %id, "delete_l2_gateway");
        Ok(())
    }

    fn create_l2_gateway_connection(&self, ctx: &RequestContext, spec: &GatewayConnectionSpec) -> DriverResult<()> {
        info!(
            request_id = %ctx.request_id,
            gateway = %spec.gateway_id,
            network = %spec.network_id,
            "create_l2_gateway_connection"
        );
        Ok(())
    }

    fn create_l2_gateway_connection_postcommit(
        &self,
        ctx: &RequestContext,
        connection: &GatewayConnection,
    ) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, connection = %connection.id, "create_l2_gateway_connection_postcommit");
        Ok(())
    }

    fn delete_l2_gateway_connection(&self, ctx: &RequestContext, id: &GatewayConnectionId) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, connection = %id, "delete_l2_gateway_connection");
        Ok(())
    }

    fn create_remote_unknown(&self, ctx: &RequestContext, payload: &RemoteUnknown) -> DriverResult<()> {
        info!(
            request_id = %ctx.request_id,
            gateway = %payload.gateway,
            network = %payload.network,
            seg_id = payload.seg_id,
            ipaddr = %payload.ipaddr,
            "create_remote_unknown"
        );
        Ok(())
    }

    fn delete_l2_remote_gateway_connection(
        &self,
        ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
    ) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, connection = %id, "delete_l2_remote_gateway_connection");
        Ok(())
    }

    fn add_ucast_mac_remote(&self, ctx: &RequestContext, mac: &UcastMacRemote) -> DriverResult<()> {
        info!(
            request_id = %ctx.request_id,
            mac = %mac.mac,
            sw = %mac.sw,
            locator = %mac.locator,
            ipaddr = ?mac.ipaddr,
            "add_ucast_mac_remote"
        );
        Ok(())
    }

    fn del_ucast_mac_remote(&self, ctx: &RequestContext, ovsdb_identifier: &str, id: &RemoteMacId) -> DriverResult<()> {
        info!(request_id = %ctx.request_id, ovsdb = ovsdb_identifier, mac = %id, "del_ucast_mac_remote");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_driver_accepts_everything() {
        let driver = LoggingDriver::new("l2gw");
        let ctx = RequestContext::admin("t1");
        assert_eq!(driver.name(), "l2gw");
        assert!(driver.delete_l2_gateway(&ctx, &GatewayId::new_v4()).is_ok());
        assert!(driver
            .del_ucast_mac_remote(&ctx, "ovsdb1", &RemoteMacId::new_v4())
            .is_ok());
        assert!(driver
            .delete_l2_gateway_precommit(&ctx, &GatewayId::new_v4())
            .is_ok());
    }
}
