//! Replacement of gateways whose device has failed.
//!
//! Failover is best-effort. Each migration step commits on its own, so an
//! error part-way leaves the steps already done in place; running it again
//! for the same gateway provisions yet another replacement.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{PluginError, PluginResult};
use crate::plugin::{L2GatewayPlugin, PluginStats};
use l2gw_db::{
    DeviceSpec, Gateway, GatewayConnectionSpec, GatewaySpec, InterfaceSpec,
    RemoteGatewayConnectionSpec,
};
use l2gw_types::{GatewayId, RequestContext};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// A failed gateway and the gateway that replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayReplacement {
    pub failed: GatewayId,
    pub replacement: GatewayId,
}

/// What [`L2GatewayPlugin::handle_failover`] did per affected gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailoverReport {
    pub ovsdb_identifier: String,
    pub replaced: Vec<GatewayReplacement>,
    /// Gateways left in place for lack of a spare device.
    pub skipped: Vec<GatewayId>,
    /// Gateways whose failover stopped with an error, with the error text.
    pub failed: Vec<(GatewayId, String)>,
}

impl FailoverReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Default)]
struct Migration {
    connections: usize,
    remote_connections: usize,
}

impl L2GatewayPlugin {
    /// Fails over every gateway using a switch managed by `ovsdb_identifier`.
    ///
    /// Each gateway is visited once even when several of its devices sit on
    /// the failed server. Errors for one gateway do not stop the others.
    pub fn handle_failover(&self, ctx: &RequestContext, ovsdb_identifier: &str) -> PluginResult<FailoverReport> {
        info!(ovsdb = ovsdb_identifier, "Handling failover");
        let switches = self.store.physical_switches_by_ovsdb(ovsdb_identifier)?;

        let mut report = FailoverReport {
            ovsdb_identifier: ovsdb_identifier.to_string(),
            ..Default::default()
        };
        let mut visited = BTreeSet::new();
        for switch in switches {
            let Some(binding) = self.store.device_by_name(&switch.name)? else {
                continue;
            };
            if !visited.insert(binding.gateway_id) {
                continue;
            }

            debug!(device = %switch.name, gateway = %binding.gateway_id, "Faulty device needs replacement");
            match self.do_failover(ctx, &binding.gateway_id, ovsdb_identifier) {
                Ok(Some(replacement)) => report.replaced.push(GatewayReplacement {
                    failed: binding.gateway_id,
                    replacement: replacement.id,
                }),
                Ok(None) => report.skipped.push(binding.gateway_id),
                Err(err) => {
                    error!(gateway = %binding.gateway_id, error = %err, "Failover failed");
                    report.failed.push((binding.gateway_id, err.to_string()));
                }
            }
        }

        info!(
            ovsdb = ovsdb_identifier,
            replaced = report.replaced.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Failover finished"
        );
        Ok(report)
    }

    /// Moves everything bound to `gateway_id` onto a gateway built from an
    /// unused device, then removes the failed gateway and the mirror state
    /// of `ovsdb_identifier`.
    ///
    /// Returns `Ok(None)` without changing anything when no spare device
    /// with an interface is available.
    pub fn do_failover(
        &self,
        ctx: &RequestContext,
        gateway_id: &GatewayId,
        ovsdb_identifier: &str,
    ) -> PluginResult<Option<Gateway>> {
        let failed = self
            .store
            .get_gateway(gateway_id)?
            .ok_or_else(|| PluginError::not_found("gateway", gateway_id))?;
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::Failover, "do_failover")
            .with_object_type("l2_gateway")
            .with_object_id(gateway_id.to_string())
            .with_details(serde_json::json!({ "ovsdb_identifier": ovsdb_identifier })));

        let replacement = match self.create_replacement_gateway(ctx, &failed, ovsdb_identifier) {
            Ok(Some(gateway)) => gateway,
            Ok(None) => {
                warn!(gateway = %gateway_id, "There is no available device, gateway stays down");
                PluginStats::bump(&self.stats.failovers_skipped);
                audit_log!(AuditRecord::for_request(ctx, AuditCategory::Failover, "do_failover")
                    .with_object_type("l2_gateway")
                    .with_object_id(gateway_id.to_string())
                    .with_error("no unused device available"));
                return Ok(None);
            }
            Err(err) => return Err(self.failover_error(ctx, gateway_id, err)),
        };

        match self.migrate(ctx, &failed, &replacement, ovsdb_identifier) {
            Ok(migration) => {
                PluginStats::bump(&self.stats.failovers);
                info!(
                    failed = %gateway_id,
                    replacement = %replacement.id,
                    connections = migration.connections,
                    remote_connections = migration.remote_connections,
                    "Gateway failed over"
                );
                audit_log!(AuditRecord::for_request(ctx, AuditCategory::Failover, "do_failover")
                    .with_outcome(AuditOutcome::Success)
                    .with_object_type("l2_gateway")
                    .with_object_id(gateway_id.to_string())
                    .with_details(serde_json::json!({
                        "replacement": replacement.id.to_string(),
                        "moved_connections": migration.connections,
                        "moved_remote_connections": migration.remote_connections,
                    })));
                Ok(Some(replacement))
            }
            Err(err) => Err(self.failover_error(ctx, gateway_id, err)),
        }
    }

    fn failover_error(&self, ctx: &RequestContext, gateway_id: &GatewayId, err: PluginError) -> PluginError {
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::Failover, "do_failover")
            .with_object_type("l2_gateway")
            .with_object_id(gateway_id.to_string())
            .with_error(err.to_string()));
        err
    }

    /// Creates a gateway with the failed one's name and tenant on the first
    /// unused device outside `ovsdb_identifier`, wired through its first port.
    fn create_replacement_gateway(
        &self,
        ctx: &RequestContext,
        failed: &Gateway,
        ovsdb_identifier: &str,
    ) -> PluginResult<Option<Gateway>> {
        let Some(device) = self.store.unused_device(ovsdb_identifier)? else {
            return Ok(None);
        };
        let Some(interface) = self.store.device_interface(&device.uuid)? else {
            warn!(device = %device.name, "Unused device has no interface");
            return Ok(None);
        };

        let spec = GatewaySpec {
            name: failed.name.clone(),
            tenant_id: Some(failed.tenant_id.clone()),
            devices: vec![DeviceSpec::new(
                device.name.clone(),
                vec![InterfaceSpec::new(interface.name)],
            )],
        };
        debug!(device = %device.name, "Creating replacement gateway");
        self.create_gateway(ctx, &spec).map(Some)
    }

    /// Moves connections onto `replacement`, drops the failed gateway and
    /// its mirror rows, then recreates its remote connections.
    ///
    /// A recreated remote connection keeps the original `flood` as given, so
    /// flooding is only set up again for connections that asked for it;
    /// connections created without `flood` are not re-announced to the
    /// driver.
    fn migrate(
        &self,
        ctx: &RequestContext,
        failed: &Gateway,
        replacement: &Gateway,
        ovsdb_identifier: &str,
    ) -> PluginResult<Migration> {
        let mut migration = Migration::default();

        for connection in self.store.connections_by_gateway(&failed.id)? {
            let spec = GatewayConnectionSpec {
                gateway_id: replacement.id,
                network_id: connection.network_id.clone(),
                segmentation_id: connection.segmentation_id,
                tenant_id: Some(connection.tenant_id.clone()),
            };
            debug!(network = %connection.network_id, "Creating gateway connection on replacement");
            self.create_gateway_connection(ctx, &spec)?;

            debug!(connection = %connection.id, "Deleting connection from faulty switch");
            self.delete_gateway_connection_quiet(ctx, &connection.id)?;
            self.store
                .delete_logical_switch_by_name(&connection.network_id, ovsdb_identifier)?;
            migration.connections += 1;
        }

        self.remove_gateway(ctx, &failed.id)?;
        self.store.delete_physical_locators_for_ovsdb(ovsdb_identifier)?;
        self.store.delete_macs_for_ovsdb(ovsdb_identifier)?;

        debug!("Moving remote connections");
        for remote in self.store.remote_connections_by_gateway(&failed.id)? {
            self.delete_remote_gateway_connection(ctx, &remote.id, false)?;
            let spec = RemoteGatewayConnectionSpec {
                gateway: replacement.id,
                network: remote.network.clone(),
                remote_gateway: remote.remote_gateway,
                seg_id: remote.seg_id.to_string(),
                flood: remote.flood,
                tenant_id: Some(remote.tenant_id.clone()),
            };
            self.create_remote_gateway_connection(ctx, &spec)?;
            migration.remote_connections += 1;
        }

        Ok(migration)
    }
}
