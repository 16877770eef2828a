//! Remote gateway, remote connection and remote MAC workflows.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{PluginError, PluginResult, ValidationError};
use crate::plugin::{L2GatewayPlugin, PluginStats};
use crate::validate;
use l2gw_db::{
    RemoteGateway, RemoteGatewayConnection, RemoteGatewayConnectionSpec,
    RemoteGatewayConnectionUpdate, RemoteGatewaySpec, RemoteGatewayUpdate, RemoteMac,
    RemoteMacSpec,
};
use l2gw_driver::{RemoteUnknown, UcastMacRemote};
use l2gw_types::{
    MacAddress, RemoteGatewayConnectionId, RemoteGatewayId, RemoteMacId, RequestContext,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Acknowledgement returned by remote MAC creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMacAck {
    pub mac: MacAddress,
    pub rgw_connection: RemoteGatewayConnectionId,
}

impl L2GatewayPlugin {
    // ------------------------------------------------------------------
    // Remote gateways
    // ------------------------------------------------------------------

    pub fn create_remote_gateway(
        &self,
        ctx: &RequestContext,
        spec: &RemoteGatewaySpec,
    ) -> PluginResult<RemoteGateway> {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" }.into());
        }
        let tenant_id = ctx.tenant_or(spec.tenant_id.as_deref());
        let remote = self.in_transaction(|store| Ok(store.create_remote_gateway(&tenant_id, spec)?))?;

        info!(remote_gateway = %remote.id, ipaddr = %remote.ipaddr, "Created remote gateway");
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceCreate, "create_l2_remote_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_remote_gateway")
            .with_object_id(remote.id.to_string())
            .with_details(serde_json::json!({ "name": remote.name, "ipaddr": remote.ipaddr.to_string() })));
        Ok(remote)
    }

    pub fn get_remote_gateway(&self, _ctx: &RequestContext, id: &RemoteGatewayId) -> PluginResult<RemoteGateway> {
        self.store
            .get_remote_gateway(id)?
            .ok_or_else(|| PluginError::not_found("remote gateway", id))
    }

    pub fn list_remote_gateways(&self, _ctx: &RequestContext) -> PluginResult<Vec<RemoteGateway>> {
        Ok(self.store.list_remote_gateways()?)
    }

    pub fn update_remote_gateway(
        &self,
        ctx: &RequestContext,
        id: &RemoteGatewayId,
        update: &RemoteGatewayUpdate,
    ) -> PluginResult<RemoteGateway> {
        let remote = self.in_transaction(|store| Ok(store.update_remote_gateway(id, update)?))?;
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceModify, "update_l2_remote_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_remote_gateway")
            .with_object_id(id.to_string()));
        Ok(remote)
    }

    /// Deletes a remote gateway no remote connection refers to.
    pub fn delete_remote_gateway(&self, ctx: &RequestContext, id: &RemoteGatewayId) -> PluginResult<()> {
        validate::remote_gateway_for_delete(self.store.as_ref(), id)?;
        self.in_transaction(|store| Ok(store.delete_remote_gateway(id)?))?;
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceDelete, "delete_l2_remote_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_remote_gateway")
            .with_object_id(id.to_string()));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote gateway connections
    // ------------------------------------------------------------------

    /// Persists a remote connection and, when `flood` was supplied, sets up
    /// unknown-destination flooding towards the remote gateway.
    ///
    /// The segmentation id is parsed before anything is written; a
    /// malformed value leaves no row behind.
    pub fn create_remote_gateway_connection(
        &self,
        ctx: &RequestContext,
        spec: &RemoteGatewayConnectionSpec,
    ) -> PluginResult<RemoteGatewayConnection> {
        let (seg_id, remote) = validate::remote_connection_for_create(self.store.as_ref(), spec)?;
        let tenant_id = ctx.tenant_or(spec.tenant_id.as_deref());
        let connection = self.in_transaction(|store| {
            Ok(store.create_remote_gateway_connection(&tenant_id, spec, seg_id)?)
        })?;
        PluginStats::bump(&self.stats.remote_connections_created);

        if spec.flood.is_some() {
            debug!(connection = %connection.id, "Sending create unknown mac to agent");
            let payload = RemoteUnknown {
                gateway: spec.gateway,
                network: spec.network.clone(),
                seg_id,
                ipaddr: remote.ipaddr,
            };
            self.driver_call(
                ctx,
                "create_remote_unknown",
                self.driver().create_remote_unknown(ctx, &payload),
            )?;
        }

        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceCreate,
            "create_l2_remote_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_remote_gateway_connection")
        .with_object_id(connection.id.to_string())
        .with_details(serde_json::json!({
            "gateway": connection.gateway.to_string(),
            "network": connection.network,
            "remote_gateway": connection.remote_gateway.to_string(),
            "seg_id": connection.seg_id,
            "flood": connection.flood,
        })));
        Ok(connection)
    }

    /// Deletes a remote connection, telling the driver first when
    /// `send_to_driver` is set.
    pub fn delete_remote_gateway_connection(
        &self,
        ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
        send_to_driver: bool,
    ) -> PluginResult<()> {
        self.get_remote_gateway_connection(ctx, id)?;
        if send_to_driver {
            debug!(connection = %id, "Sending delete remote gateway connection to agent");
            self.driver_call(
                ctx,
                "delete_l2_remote_gateway_connection",
                self.driver().delete_l2_remote_gateway_connection(ctx, id),
            )?;
        }
        self.in_transaction(|store| Ok(store.delete_remote_gateway_connection(id)?))?;
        PluginStats::bump(&self.stats.remote_connections_deleted);

        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceDelete,
            "delete_l2_remote_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_remote_gateway_connection")
        .with_object_id(id.to_string())
        .with_details(serde_json::json!({ "send_to_driver": send_to_driver })));
        Ok(())
    }

    pub fn get_remote_gateway_connection(
        &self,
        _ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
    ) -> PluginResult<RemoteGatewayConnection> {
        self.store
            .get_remote_gateway_connection(id)?
            .ok_or_else(|| PluginError::not_found("remote gateway connection", id))
    }

    pub fn list_remote_gateway_connections(
        &self,
        _ctx: &RequestContext,
    ) -> PluginResult<Vec<RemoteGatewayConnection>> {
        Ok(self.store.list_remote_gateway_connections()?)
    }

    /// Changes the stored attributes of a remote connection. The driver is
    /// not notified.
    pub fn update_remote_gateway_connection(
        &self,
        ctx: &RequestContext,
        id: &RemoteGatewayConnectionId,
        update: &RemoteGatewayConnectionUpdate,
    ) -> PluginResult<RemoteGatewayConnection> {
        let seg_id = update
            .seg_id
            .as_deref()
            .map(validate::parse_seg_id)
            .transpose()?;
        if let Some(network) = update.network.as_deref() {
            if network.trim().is_empty() {
                return Err(ValidationError::MissingField { field: "network" }.into());
            }
            validate::existing_network(self.store.as_ref(), network)?;
        }
        let connection = self.in_transaction(|store| {
            Ok(store.update_remote_gateway_connection(id, update.network.as_deref(), seg_id, update.flood)?)
        })?;
        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceModify,
            "update_l2_remote_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_remote_gateway_connection")
        .with_object_id(id.to_string()));
        Ok(connection)
    }

    // ------------------------------------------------------------------
    // Remote MACs (admin only)
    // ------------------------------------------------------------------

    /// Adds a remote MAC behind a remote connection.
    ///
    /// The logical switch and physical locator are resolved from the
    /// connection before anything is written. A driver failure is returned
    /// with the row left in place.
    pub fn create_remote_mac(&self, ctx: &RequestContext, spec: &RemoteMacSpec) -> PluginResult<RemoteMacAck> {
        self.admin_check(ctx, "create", "l2_remote_mac")?;
        debug!(mac = %spec.mac, "Creating new remote MAC");

        let connection = self.get_remote_gateway_connection(ctx, &spec.rgw_connection)?;
        let switch = self
            .store
            .logical_switch_by_name(&connection.network)?
            .ok_or_else(|| PluginError::not_found("logical switch", &connection.network))?;
        let remote = self.get_remote_gateway(ctx, &connection.remote_gateway)?;
        let locator = self
            .store
            .physical_locator_by_ip_and_key(&remote.ipaddr, connection.seg_id)?
            .ok_or_else(|| {
                PluginError::not_found("physical locator", format!("{}/{}", remote.ipaddr, connection.seg_id))
            })?;

        let ucast_mac = UcastMacRemote {
            mac: spec.mac,
            sw: switch.uuid,
            locator: locator.uuid,
            gateway: connection.gateway,
            ipaddr: spec.ipaddr,
        };

        let tenant_id = ctx.tenant_or(spec.tenant_id.as_deref());
        let remote_mac = self.in_transaction(|store| Ok(store.create_remote_mac(&tenant_id, spec)?))?;
        PluginStats::bump(&self.stats.remote_macs_created);

        self.driver_call(
            ctx,
            "add_ucast_mac_remote",
            self.driver().add_ucast_mac_remote(ctx, &ucast_mac),
        )?;

        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceCreate, "create_l2_remote_mac")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_remote_mac")
            .with_object_id(remote_mac.id.to_string())
            .with_details(serde_json::json!({
                "mac": remote_mac.mac.to_string(),
                "rgw_connection": remote_mac.rgw_connection.to_string(),
            })));
        Ok(RemoteMacAck {
            mac: spec.mac,
            rgw_connection: spec.rgw_connection,
        })
    }

    /// Removes a remote MAC and its entry on the OVSDB server that holds it.
    pub fn delete_remote_mac(&self, ctx: &RequestContext, id: &RemoteMacId) -> PluginResult<()> {
        self.admin_check(ctx, "delete", "l2_remote_mac")?;
        debug!(remote_mac = %id, "Deleting remote MAC");
        self.get_remote_mac(ctx, id)?;

        let mirror = self.in_transaction(|store| {
            store.delete_remote_mac(id)?;
            store
                .ucast_mac_remote_by_id(id.as_uuid())?
                .ok_or_else(|| PluginError::not_found("ucast mac remote", id))
        })?;
        PluginStats::bump(&self.stats.remote_macs_deleted);

        self.driver_call(
            ctx,
            "del_ucast_mac_remote",
            self.driver().del_ucast_mac_remote(ctx, &mirror.ovsdb_identifier, id),
        )?;

        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceDelete, "delete_l2_remote_mac")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_remote_mac")
            .with_object_id(id.to_string())
            .with_details(serde_json::json!({ "ovsdb_identifier": mirror.ovsdb_identifier })));
        Ok(())
    }

    pub fn get_remote_mac(&self, _ctx: &RequestContext, id: &RemoteMacId) -> PluginResult<RemoteMac> {
        self.store
            .get_remote_mac(id)?
            .ok_or_else(|| PluginError::not_found("remote mac", id))
    }

    pub fn list_remote_macs(&self, _ctx: &RequestContext) -> PluginResult<Vec<RemoteMac>> {
        Ok(self.store.list_remote_macs()?)
    }
}
