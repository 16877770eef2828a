//! Gateway and gateway-connection workflows.
//!
//! Each mutating operation runs the same sequence:
//!
//! 1. validate against persisted state
//! 2. driver pre-call with the raw request
//! 3. transaction: persist, then driver precommit with the stored instance
//! 4. driver postcommit after commit
//!
//! A postcommit failure on create deletes the new entity again through the
//! normal delete workflow. On update and delete it is logged and returned;
//! the persisted change stays and the driver may be stale.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{PluginError, PluginResult};
use crate::plugin::{L2GatewayPlugin, PluginStats};
use crate::validate;
use l2gw_db::{Gateway, GatewayConnection, GatewayConnectionSpec, GatewaySpec, GatewayUpdate};
use l2gw_types::{GatewayConnectionId, GatewayId, RequestContext};
use tracing::{debug, error, info};

impl L2GatewayPlugin {
    // ------------------------------------------------------------------
    // Gateways
    // ------------------------------------------------------------------

    pub fn create_gateway(&self, ctx: &RequestContext, spec: &GatewaySpec) -> PluginResult<Gateway> {
        validate::gateway_for_create(spec)?;
        let driver = self.driver();
        self.driver_call(ctx, "create_l2_gateway", driver.create_l2_gateway(ctx, spec))?;

        let tenant_id = ctx.tenant_or(spec.tenant_id.as_deref());
        let gateway = self.in_transaction(|store| {
            let gateway = store.create_gateway(&tenant_id, spec)?;
            self.driver_call(
                ctx,
                "create_l2_gateway_precommit",
                driver.create_l2_gateway_precommit(ctx, &gateway),
            )?;
            Ok(gateway)
        })?;

        if let Err(source) = driver.create_l2_gateway_postcommit(ctx, &gateway) {
            error!(
                gateway = %gateway.id,
                error = %source,
                "create_l2_gateway_postcommit failed, deleting gateway"
            );
            PluginStats::bump(&self.stats.driver_errors);
            let result = self.delete_gateway(ctx, &gateway.id);
            let compensation = self.compensation_outcome(result, || {
                self.store.get_gateway(&gateway.id).map(|g| g.is_some())
            });
            audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceCreate, "create_l2_gateway")
                .with_object_type("l2_gateway")
                .with_object_id(gateway.id.to_string())
                .with_details(serde_json::json!({ "compensation": format!("{compensation:?}") }))
                .with_error(source.to_string()));
            return Err(PluginError::Driver {
                operation: "create_l2_gateway_postcommit",
                source,
                compensation,
            });
        }

        PluginStats::bump(&self.stats.gateways_created);
        info!(gateway = %gateway.id, name = %gateway.name, "Created L2 gateway");
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceCreate, "create_l2_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_gateway")
            .with_object_id(gateway.id.to_string())
            .with_details(serde_json::json!({
                "name": gateway.name,
                "tenant_id": gateway.tenant_id,
                "devices": gateway.device_names().collect::<Vec<_>>(),
            })));
        Ok(gateway)
    }

    pub fn update_gateway(
        &self,
        ctx: &RequestContext,
        id: &GatewayId,
        update: &GatewayUpdate,
    ) -> PluginResult<Gateway> {
        validate::gateway_for_update(self.store.as_ref(), id, update)?;
        let driver = self.driver();
        self.driver_call(ctx, "update_l2_gateway", driver.update_l2_gateway(ctx, id, update))?;

        let gateway = self.in_transaction(|store| {
            let gateway = store.update_gateway(id, update)?;
            self.driver_call(
                ctx,
                "update_l2_gateway_precommit",
                driver.update_l2_gateway_precommit(ctx, &gateway),
            )?;
            Ok(gateway)
        })?;
        PluginStats::bump(&self.stats.gateways_updated);

        let postcommit = driver.update_l2_gateway_postcommit(ctx, &gateway);
        if let Err(err) = &postcommit {
            error!(gateway = %id, error = %err, "update_l2_gateway_postcommit failed");
        }
        self.driver_call(ctx, "update_l2_gateway_postcommit", postcommit)?;

        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceModify, "update_l2_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_gateway")
            .with_object_id(id.to_string()));
        Ok(gateway)
    }

    pub fn delete_gateway(&self, ctx: &RequestContext, id: &GatewayId) -> PluginResult<()> {
        validate::gateway_for_delete(self.store.as_ref(), id)?;
        self.remove_gateway(ctx, id)
    }

    /// Delete workflow without the in-use checks.
    ///
    /// Failover removes the old gateway while its remote connections still
    /// point at it and moves them afterwards.
    pub(crate) fn remove_gateway(&self, ctx: &RequestContext, id: &GatewayId) -> PluginResult<()> {
        let driver = self.driver();
        self.driver_call(ctx, "delete_l2_gateway", driver.delete_l2_gateway(ctx, id))?;

        self.in_transaction(|store| {
            store.delete_gateway(id)?;
            self.driver_call(
                ctx,
                "delete_l2_gateway_precommit",
                driver.delete_l2_gateway_precommit(ctx, id),
            )
        })?;
        PluginStats::bump(&self.stats.gateways_deleted);

        let postcommit = driver.delete_l2_gateway_postcommit(ctx, id);
        if let Err(err) = &postcommit {
            error!(gateway = %id, error = %err, "delete_l2_gateway_postcommit failed");
        }
        self.driver_call(ctx, "delete_l2_gateway_postcommit", postcommit)?;

        info!(gateway = %id, "Deleted L2 gateway");
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::ResourceDelete, "delete_l2_gateway")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("l2_gateway")
            .with_object_id(id.to_string()));
        Ok(())
    }

    pub fn get_gateway(&self, _ctx: &RequestContext, id: &GatewayId) -> PluginResult<Gateway> {
        self.store
            .get_gateway(id)?
            .ok_or_else(|| PluginError::not_found("gateway", id))
    }

    pub fn list_gateways(&self, _ctx: &RequestContext) -> PluginResult<Vec<Gateway>> {
        Ok(self.store.list_gateways()?)
    }

    // ------------------------------------------------------------------
    // Gateway connections
    // ------------------------------------------------------------------

    /// Binds a network to a gateway.
    pub fn create_gateway_connection(
        &self,
        ctx: &RequestContext,
        spec: &GatewayConnectionSpec,
    ) -> PluginResult<GatewayConnection> {
        validate::connection_for_create(self.store.as_ref(), spec)?;
        let driver = self.driver();
        self.driver_call(
            ctx,
            "create_l2_gateway_connection",
            driver.create_l2_gateway_connection(ctx, spec),
        )?;

        let tenant_id = ctx.tenant_or(spec.tenant_id.as_deref());
        let connection = self.in_transaction(|store| {
            let connection = store.create_gateway_connection(&tenant_id, spec)?;
            self.driver_call(
                ctx,
                "create_l2_gateway_connection_precommit",
                driver.create_l2_gateway_connection_precommit(ctx, &connection),
            )?;
            Ok(connection)
        })?;

        if let Err(source) = driver.create_l2_gateway_connection_postcommit(ctx, &connection) {
            error!(
                connection = %connection.id,
                error = %source,
                "create_l2_gateway_connection_postcommit failed, deleting connection"
            );
            PluginStats::bump(&self.stats.driver_errors);
            let result = self.delete_gateway_connection(ctx, &connection.id);
            let compensation = self.compensation_outcome(result, || {
                self.store
                    .get_gateway_connection(&connection.id)
                    .map(|c| c.is_some())
            });
            audit_log!(AuditRecord::for_request(
                ctx,
                AuditCategory::ResourceCreate,
                "create_l2_gateway_connection"
            )
            .with_object_type("l2_gateway_connection")
            .with_object_id(connection.id.to_string())
            .with_details(serde_json::json!({ "compensation": format!("{compensation:?}") }))
            .with_error(source.to_string()));
            return Err(PluginError::Driver {
                operation: "create_l2_gateway_connection_postcommit",
                source,
                compensation,
            });
        }

        PluginStats::bump(&self.stats.connections_created);
        info!(
            connection = %connection.id,
            gateway = %connection.gateway_id,
            network = %connection.network_id,
            "Created L2 gateway connection"
        );
        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceCreate,
            "create_l2_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_gateway_connection")
        .with_object_id(connection.id.to_string())
        .with_details(serde_json::json!({
            "gateway_id": connection.gateway_id.to_string(),
            "network_id": connection.network_id,
            "segmentation_id": connection.segmentation_id.map(|s| s.as_u16()),
        })));
        Ok(connection)
    }

    /// Unbinds a network from a gateway.
    pub fn delete_gateway_connection(
        &self,
        ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> PluginResult<()> {
        validate::connection_for_delete(self.store.as_ref(), id)?;
        let driver = self.driver();
        self.driver_call(
            ctx,
            "delete_l2_gateway_connection",
            driver.delete_l2_gateway_connection(ctx, id),
        )?;

        self.in_transaction(|store| {
            store.delete_gateway_connection(id)?;
            self.driver_call(
                ctx,
                "delete_l2_gateway_connection_precommit",
                driver.delete_l2_gateway_connection_precommit(ctx, id),
            )
        })?;
        PluginStats::bump(&self.stats.connections_deleted);

        let postcommit = driver.delete_l2_gateway_connection_postcommit(ctx, id);
        if let Err(err) = &postcommit {
            error!(connection = %id, error = %err, "delete_l2_gateway_connection_postcommit failed");
        }
        self.driver_call(ctx, "delete_l2_gateway_connection_postcommit", postcommit)?;

        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceDelete,
            "delete_l2_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_gateway_connection")
        .with_object_id(id.to_string()));
        Ok(())
    }

    /// Removes a connection row without notifying the driver.
    ///
    /// Used by failover, where the failed device's driver state is dropped
    /// wholesale rather than per connection.
    pub fn delete_gateway_connection_quiet(
        &self,
        ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> PluginResult<()> {
        validate::connection_for_delete(self.store.as_ref(), id)?;
        self.in_transaction(|store| Ok(store.delete_gateway_connection(id)?))?;
        PluginStats::bump(&self.stats.connections_deleted);
        debug!(connection = %id, "Deleted L2 gateway connection without driver notification");
        audit_log!(AuditRecord::for_request(
            ctx,
            AuditCategory::ResourceDelete,
            "delete_l2_gateway_connection"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_type("l2_gateway_connection")
        .with_object_id(id.to_string())
        .with_details(serde_json::json!({ "send_to_driver": false })));
        Ok(())
    }

    pub fn get_gateway_connection(
        &self,
        _ctx: &RequestContext,
        id: &GatewayConnectionId,
    ) -> PluginResult<GatewayConnection> {
        self.store
            .get_gateway_connection(id)?
            .ok_or_else(|| PluginError::not_found("gateway connection", id))
    }

    pub fn list_gateway_connections(&self, _ctx: &RequestContext) -> PluginResult<Vec<GatewayConnection>> {
        Ok(self.store.list_gateway_connections()?)
    }
}
