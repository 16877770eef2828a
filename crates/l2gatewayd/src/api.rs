//! JSON request/response envelope used by `l2gatewayd serve`.
//!
//! One [`Request`] per line in, one [`Response`] per line out:
//!
//! ```text
//! {"op":"list_gateways"}
//! {"ok":true,"data":[...]}
//! ```

use crate::error::PluginError;
use crate::plugin::L2GatewayPlugin;
use l2gw_db::{
    GatewayConnectionSpec, GatewaySpec, GatewayUpdate, RemoteGatewayConnectionSpec,
    RemoteGatewayConnectionUpdate, RemoteGatewaySpec, RemoteGatewayUpdate, RemoteMacSpec,
};
use l2gw_driver::PortMac;
use l2gw_types::{
    GatewayConnectionId, GatewayId, RemoteGatewayConnectionId, RemoteGatewayId, RemoteMacId,
    RequestContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

fn default_true() -> bool {
    true
}

/// Every operation the service exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateGateway { gateway: GatewaySpec },
    UpdateGateway { id: GatewayId, update: GatewayUpdate },
    DeleteGateway { id: GatewayId },
    GetGateway { id: GatewayId },
    ListGateways,

    CreateGatewayConnection { connection: GatewayConnectionSpec },
    DeleteGatewayConnection { id: GatewayConnectionId },
    GetGatewayConnection { id: GatewayConnectionId },
    ListGatewayConnections,

    CreateRemoteGateway { remote_gateway: RemoteGatewaySpec },
    UpdateRemoteGateway { id: RemoteGatewayId, update: RemoteGatewayUpdate },
    DeleteRemoteGateway { id: RemoteGatewayId },
    GetRemoteGateway { id: RemoteGatewayId },
    ListRemoteGateways,

    CreateRemoteGatewayConnection { connection: RemoteGatewayConnectionSpec },
    UpdateRemoteGatewayConnection {
        id: RemoteGatewayConnectionId,
        update: RemoteGatewayConnectionUpdate,
    },
    DeleteRemoteGatewayConnection {
        id: RemoteGatewayConnectionId,
        #[serde(default = "default_true")]
        send_to_driver: bool,
    },
    GetRemoteGatewayConnection { id: RemoteGatewayConnectionId },
    ListRemoteGatewayConnections,

    CreateRemoteMac { remote_mac: RemoteMacSpec },
    DeleteRemoteMac { id: RemoteMacId },
    GetRemoteMac { id: RemoteMacId },
    ListRemoteMacs,

    AddPortMac { port: PortMac },
    DeletePortMac { port: PortMac },

    Failover { ovsdb_identifier: String },
    Stats,
}

impl Request {
    /// Whether the request can change persisted state.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Request::GetGateway { .. }
                | Request::ListGateways
                | Request::GetGatewayConnection { .. }
                | Request::ListGatewayConnections
                | Request::GetRemoteGateway { .. }
                | Request::ListRemoteGateways
                | Request::GetRemoteGatewayConnection { .. }
                | Request::ListRemoteGatewayConnections
                | Request::GetRemoteMac { .. }
                | Request::ListRemoteMacs
                | Request::AddPortMac { .. }
                | Request::DeletePortMac { .. }
                | Request::Stats
        )
    }
}

/// Outcome of one [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error class, see [`PluginError::kind`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl Response {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            ok: true,
            data,
            kind: None,
            message: None,
            retryable: None,
        }
    }

    pub fn error(err: &PluginError) -> Self {
        let message = match err.driver_source() {
            Some(source) => format!("{err}: {source}"),
            None => err.to_string(),
        };
        Self {
            ok: false,
            data: None,
            kind: Some(err.kind().to_string()),
            message: Some(message),
            retryable: Some(err.is_retryable()),
        }
    }

    /// A request line that could not be decoded.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            kind: Some("bad_request".to_string()),
            message: Some(message.into()),
            retryable: Some(false),
        }
    }
}

fn data<T: Serialize>(value: T) -> Result<Option<Value>, PluginError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| PluginError::Config(format!("failed to encode response: {e}")))
}

/// Runs `request` against `plugin` on behalf of `ctx`.
pub fn dispatch(plugin: &L2GatewayPlugin, ctx: &RequestContext, request: Request) -> Response {
    debug!(request_id = %ctx.request_id, ?request, "Dispatching request");
    match execute(plugin, ctx, request) {
        Ok(data) => Response::ok(data),
        Err(err) => Response::error(&err),
    }
}

fn execute(
    plugin: &L2GatewayPlugin,
    ctx: &RequestContext,
    request: Request,
) -> Result<Option<Value>, PluginError> {
    match request {
        Request::CreateGateway { gateway } => data(plugin.create_gateway(ctx, &gateway)?),
        Request::UpdateGateway { id, update } => data(plugin.update_gateway(ctx, &id, &update)?),
        Request::DeleteGateway { id } => plugin.delete_gateway(ctx, &id).map(|_| None),
        Request::GetGateway { id } => data(plugin.get_gateway(ctx, &id)?),
        Request::ListGateways => data(plugin.list_gateways(ctx)?),

        Request::CreateGatewayConnection { connection } => {
            data(plugin.create_gateway_connection(ctx, &connection)?)
        }
        Request::DeleteGatewayConnection { id } => {
            plugin.delete_gateway_connection(ctx, &id).map(|_| None)
        }
        Request::GetGatewayConnection { id } => data(plugin.get_gateway_connection(ctx, &id)?),
        Request::ListGatewayConnections => data(plugin.list_gateway_connections(ctx)?),

        Request::CreateRemoteGateway { remote_gateway } => {
            data(plugin.create_remote_gateway(ctx, &remote_gateway)?)
        }
        Request::UpdateRemoteGateway { id, update } => {
            data(plugin.update_remote_gateway(ctx, &id, &update)?)
        }
        Request::DeleteRemoteGateway { id } => plugin.delete_remote_gateway(ctx, &id).map(|_| None),
        Request::GetRemoteGateway { id } => data(plugin.get_remote_gateway(ctx, &id)?),
        Request::ListRemoteGateways => data(plugin.list_remote_gateways(ctx)?),

        Request::CreateRemoteGatewayConnection { connection } => {
            data(plugin.create_remote_gateway_connection(ctx, &connection)?)
        }
        Request::UpdateRemoteGatewayConnection { id, update } => {
            data(plugin.update_remote_gateway_connection(ctx, &id, &update)?)
        }
        Request::DeleteRemoteGatewayConnection { id, send_to_driver } => plugin
            .delete_remote_gateway_connection(ctx, &id, send_to_driver)
            .map(|_| None),
        Request::GetRemoteGatewayConnection { id } => {
            data(plugin.get_remote_gateway_connection(ctx, &id)?)
        }
        Request::ListRemoteGatewayConnections => data(plugin.list_remote_gateway_connections(ctx)?),

        Request::CreateRemoteMac { remote_mac } => data(plugin.create_remote_mac(ctx, &remote_mac)?),
        Request::DeleteRemoteMac { id } => plugin.delete_remote_mac(ctx, &id).map(|_| None),
        Request::GetRemoteMac { id } => data(plugin.get_remote_mac(ctx, &id)?),
        Request::ListRemoteMacs => data(plugin.list_remote_macs(ctx)?),

        Request::AddPortMac { port } => plugin.add_port_mac(ctx, &port).map(|_| None),
        Request::DeletePortMac { port } => plugin.delete_port_mac(ctx, &port).map(|_| None),

        Request::Failover { ovsdb_identifier } => data(plugin.handle_failover(ctx, &ovsdb_identifier)?),
        Request::Stats => data(plugin.stats()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2gw_db::L2gwStore;
    use l2gw_driver::{DriverError, DriverRegistry};
    use l2gw_test::{gateway_spec, seeded_store, RecordingDriver, TENANT};
    use std::sync::Arc;

    fn plugin() -> (L2GatewayPlugin, Arc<RecordingDriver>) {
        let store: Arc<dyn L2gwStore> = seeded_store();
        let driver = Arc::new(RecordingDriver::with_store(store.clone()));
        let plugin = L2GatewayPlugin::new(store, DriverRegistry::single("l2gw", driver.clone()));
        (plugin, driver)
    }

    #[test]
    fn test_request_decoding() {
        let req: Request = serde_json::from_str(r#"{"op":"list_gateways"}"#).unwrap();
        assert_eq!(req, Request::ListGateways);
        assert!(!req.is_mutating());

        let id = RemoteGatewayConnectionId::new_v4();
        let line = format!(r#"{{"op":"delete_remote_gateway_connection","id":"{id}"}}"#);
        let req: Request = serde_json::from_str(&line).unwrap();
        assert_eq!(
            req,
            Request::DeleteRemoteGatewayConnection {
                id,
                send_to_driver: true
            }
        );
        assert!(req.is_mutating());

        assert!(serde_json::from_str::<Request>(r#"{"op":"reboot"}"#).is_err());
    }

    #[test]
    fn test_dispatch_create_and_list() {
        let (plugin, _) = plugin();
        let ctx = RequestContext::tenant(TENANT);

        let resp = dispatch(
            &plugin,
            &ctx,
            Request::CreateGateway {
                gateway: gateway_spec("gw1", "sw1", "eth0"),
            },
        );
        assert!(resp.ok);
        assert_eq!(resp.data.as_ref().unwrap()["name"], "gw1");

        let resp = dispatch(&plugin, &ctx, Request::ListGateways);
        assert_eq!(resp.data.unwrap().as_array().unwrap().len(), 1);

        let resp = dispatch(&plugin, &ctx, Request::Stats);
        assert_eq!(resp.data.unwrap()["gateways_created"], 1);
    }

    #[test]
    fn test_dispatch_errors_carry_kind() {
        let (plugin, driver) = plugin();
        let ctx = RequestContext::tenant(TENANT);

        let resp = dispatch(&plugin, &ctx, Request::GetGateway { id: GatewayId::new_v4() });
        assert!(!resp.ok);
        assert_eq!(resp.kind.as_deref(), Some("not_found"));

        driver.fail_on(
            "create_l2_gateway",
            DriverError::Unavailable {
                provider: "l2gw".to_string(),
            },
        );
        let resp = dispatch(
            &plugin,
            &ctx,
            Request::CreateGateway {
                gateway: gateway_spec("gw1", "sw1", "eth0"),
            },
        );
        assert_eq!(resp.kind.as_deref(), Some("driver"));
        assert_eq!(resp.retryable, Some(true));
        assert!(resp.message.unwrap().contains("unavailable"));
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let json = serde_json::to_string(&Response::ok(None)).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }
}
