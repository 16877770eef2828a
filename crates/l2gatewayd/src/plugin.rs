//! The L2 gateway service plugin: shared plumbing for the workflows.
//!
//! The workflows themselves live in [`crate::gateway`], [`crate::remote`]
//! and [`crate::failover`] as further `impl L2GatewayPlugin` blocks.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::config::ServiceConfig;
use crate::error::{Compensation, PluginError, PluginResult};
use l2gw_db::{DbResult, L2gwStore};
use l2gw_driver::{DriverFactory, DriverRegistry, DriverResult, PortMac, ServiceDriver};
use l2gw_types::RequestContext;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Service type reported by [`L2GatewayPlugin::plugin_type`].
pub const PLUGIN_TYPE: &str = "L2GW";

pub const PLUGIN_DESCRIPTION: &str = "L2 Gateway Service Plugin";

/// API extensions served by the plugin.
pub const SUPPORTED_EXTENSION_ALIASES: [&str; 5] = [
    "l2-gateway",
    "l2-gateway-connection",
    "l2-remote-gateway",
    "l2-remote-gateway-connection",
    "l2-remote-mac",
];

/// Operation counters.
#[derive(Debug, Default)]
pub struct PluginStats {
    pub gateways_created: AtomicU64,
    pub gateways_updated: AtomicU64,
    pub gateways_deleted: AtomicU64,
    pub connections_created: AtomicU64,
    pub connections_deleted: AtomicU64,
    pub remote_connections_created: AtomicU64,
    pub remote_connections_deleted: AtomicU64,
    pub remote_macs_created: AtomicU64,
    pub remote_macs_deleted: AtomicU64,
    pub driver_errors: AtomicU64,
    pub compensations: AtomicU64,
    pub failovers: AtomicU64,
    pub failovers_skipped: AtomicU64,
}

/// Point-in-time copy of [`PluginStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginStatsSnapshot {
    pub gateways_created: u64,
    pub gateways_updated: u64,
    pub gateways_deleted: u64,
    pub connections_created: u64,
    pub connections_deleted: u64,
    pub remote_connections_created: u64,
    pub remote_connections_deleted: u64,
    pub remote_macs_created: u64,
    pub remote_macs_deleted: u64,
    pub driver_errors: u64,
    pub compensations: u64,
    pub failovers: u64,
    pub failovers_skipped: u64,
}

impl PluginStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PluginStatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PluginStatsSnapshot {
            gateways_created: get(&self.gateways_created),
            gateways_updated: get(&self.gateways_updated),
            gateways_deleted: get(&self.gateways_deleted),
            connections_created: get(&self.connections_created),
            connections_deleted: get(&self.connections_deleted),
            remote_connections_created: get(&self.remote_connections_created),
            remote_connections_deleted: get(&self.remote_connections_deleted),
            remote_macs_created: get(&self.remote_macs_created),
            remote_macs_deleted: get(&self.remote_macs_deleted),
            driver_errors: get(&self.driver_errors),
            compensations: get(&self.compensations),
            failovers: get(&self.failovers),
            failovers_skipped: get(&self.failovers_skipped),
        }
    }
}

/// Orchestration core for gateways, connections, remote MACs and failover.
///
/// Holds the persistence layer and the driver registry by composition.
/// Every public operation runs to completion on the calling thread; the
/// store's transaction scopes are the only isolation.
pub struct L2GatewayPlugin {
    pub(crate) store: Arc<dyn L2gwStore>,
    drivers: DriverRegistry,
    pub(crate) stats: PluginStats,
}

impl L2GatewayPlugin {
    pub fn new(store: Arc<dyn L2gwStore>, drivers: DriverRegistry) -> Self {
        info!(
            provider = drivers.default_provider(),
            "L2 gateway service plugin using service driver"
        );
        Self {
            store,
            drivers,
            stats: PluginStats::default(),
        }
    }

    /// Builds the plugin with the drivers named in `config`.
    pub fn from_config(
        config: &ServiceConfig,
        store: Arc<dyn L2gwStore>,
        factory: &DriverFactory,
    ) -> PluginResult<Self> {
        let providers = config.providers()?;
        let drivers = DriverRegistry::from_providers(&providers, factory)?;
        Ok(Self::new(store, drivers))
    }

    pub fn plugin_type(&self) -> &'static str {
        PLUGIN_TYPE
    }

    pub fn plugin_description(&self) -> &'static str {
        PLUGIN_DESCRIPTION
    }

    pub fn supported_extension_aliases(&self) -> &'static [&'static str] {
        &SUPPORTED_EXTENSION_ALIASES
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn store(&self) -> &Arc<dyn L2gwStore> {
        &self.store
    }

    pub fn stats(&self) -> PluginStatsSnapshot {
        self.stats.snapshot()
    }

    /// The driver every operation is sent to.
    pub(crate) fn driver(&self) -> &Arc<dyn ServiceDriver> {
        self.drivers.default_driver()
    }

    // ------------------------------------------------------------------
    // Port passthrough
    // ------------------------------------------------------------------

    /// Forwards a port created in the core networking service.
    pub fn add_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> PluginResult<()> {
        debug!(port = %port.port_id, mac = %port.mac, "add_port_mac");
        self.driver_call(ctx, "add_port_mac", self.driver().add_port_mac(ctx, port))
    }

    /// Forwards a port deleted in the core networking service.
    pub fn delete_port_mac(&self, ctx: &RequestContext, port: &PortMac) -> PluginResult<()> {
        debug!(port = %port.port_id, mac = %port.mac, "delete_port_mac");
        self.driver_call(ctx, "delete_port_mac", self.driver().delete_port_mac(ctx, port))
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    /// Runs `body` inside a (possibly nested) transaction scope.
    ///
    /// The scope commits when `body` succeeds and rolls back otherwise.
    pub(crate) fn in_transaction<T>(
        &self,
        body: impl FnOnce(&dyn L2gwStore) -> PluginResult<T>,
    ) -> PluginResult<T> {
        self.store.begin()?;
        match body(self.store.as_ref()) {
            Ok(value) => {
                self.store.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    error!(error = %rollback_err, "Rollback failed after {}", err);
                }
                Err(err)
            }
        }
    }

    /// Converts a driver result, counting and auditing failures.
    pub(crate) fn driver_call(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        result: DriverResult<()>,
    ) -> PluginResult<()> {
        result.map_err(|source| {
            PluginStats::bump(&self.stats.driver_errors);
            audit_log!(AuditRecord::for_request(ctx, AuditCategory::DriverOperation, operation)
                .with_object_type("driver")
                .with_object_id(self.drivers.default_provider())
                .with_error(source.to_string()));
            PluginError::driver(operation, source)
        })
    }

    /// Rejects callers without the admin role.
    pub(crate) fn admin_check(
        &self,
        ctx: &RequestContext,
        action: &'static str,
        resource: &'static str,
    ) -> PluginResult<()> {
        if ctx.is_admin {
            return Ok(());
        }
        warn!(user = %ctx.user_id, tenant = %ctx.tenant_id, action, resource, "Admin role required");
        audit_log!(AuditRecord::for_request(ctx, AuditCategory::AccessControl, action)
            .with_object_type(resource)
            .with_outcome(AuditOutcome::Denied));
        Err(PluginError::NotAuthorized { action, resource })
    }

    /// Classifies the result of a compensating delete.
    ///
    /// A failed delete still counts as cleanup when the entity is gone,
    /// which happens when only the delete postcommit was refused.
    pub(crate) fn compensation_outcome(
        &self,
        result: PluginResult<()>,
        still_present: impl FnOnce() -> DbResult<bool>,
    ) -> Compensation {
        PluginStats::bump(&self.stats.compensations);
        match result {
            Ok(()) => Compensation::Deleted,
            Err(err) if err.is_not_found() => Compensation::Deleted,
            Err(err) => match still_present() {
                Ok(false) => {
                    warn!(error = %err, "Compensating delete reported an error after removing the entity");
                    Compensation::Deleted
                }
                _ => Compensation::Failed(err.to_string()),
            },
        }
    }
}

impl std::fmt::Debug for L2GatewayPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("L2GatewayPlugin")
            .field("drivers", &self.drivers)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
