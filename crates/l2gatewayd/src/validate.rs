//! Request preconditions checked against persisted state.
//!
//! Every check here is read-only. A failure is reported before the driver
//! sees the request.

use crate::error::{PluginError, PluginResult, ValidationError};
use l2gw_db::{
    DeviceSpec, Gateway, GatewayConnection, GatewayConnectionSpec, GatewaySpec, GatewayUpdate,
    L2gwStore, RemoteGateway, RemoteGatewayConnectionSpec,
};
use l2gw_types::{GatewayConnectionId, GatewayId, RemoteGatewayId};
use std::collections::HashSet;

/// Checks a device list: at least one device, each named uniquely and
/// exposing at least one uniquely named interface.
pub fn devices(devices: &[DeviceSpec]) -> Result<(), ValidationError> {
    if devices.is_empty() {
        return Err(ValidationError::NoDevices);
    }

    let mut seen = HashSet::new();
    for device in devices {
        let name = device.device_name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyDeviceName);
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateDevice {
                device: name.to_string(),
            });
        }
        if device.interfaces.is_empty() {
            return Err(ValidationError::NoInterfaces {
                device: name.to_string(),
            });
        }

        let mut interfaces = HashSet::new();
        for interface in &device.interfaces {
            if !interfaces.insert(interface.name.as_str()) {
                return Err(ValidationError::DuplicateInterface {
                    device: name.to_string(),
                    interface: interface.name.clone(),
                });
            }
        }
    }
    Ok(())
}

pub fn gateway_for_create(spec: &GatewaySpec) -> PluginResult<()> {
    devices(&spec.devices)?;
    Ok(())
}

pub fn gateway_for_update(
    store: &dyn L2gwStore,
    id: &GatewayId,
    update: &GatewayUpdate,
) -> PluginResult<Gateway> {
    let gateway = existing_gateway(store, id)?;
    if let Some(new_devices) = &update.devices {
        devices(new_devices)?;
        if !store.connections_by_gateway(id)?.is_empty() {
            return Err(ValidationError::GatewayInUse {
                gateway: id.to_string(),
            }
            .into());
        }
    }
    Ok(gateway)
}

/// A gateway can only be deleted once neither local nor remote connections
/// reference it.
pub fn gateway_for_delete(store: &dyn L2gwStore, id: &GatewayId) -> PluginResult<Gateway> {
    let gateway = existing_gateway(store, id)?;
    if !store.connections_by_gateway(id)?.is_empty()
        || !store.remote_connections_by_gateway(id)?.is_empty()
    {
        return Err(ValidationError::GatewayInUse {
            gateway: id.to_string(),
        }
        .into());
    }
    Ok(gateway)
}

pub fn connection_for_create(
    store: &dyn L2gwStore,
    spec: &GatewayConnectionSpec,
) -> PluginResult<Gateway> {
    let gateway = existing_gateway(store, &spec.gateway_id)?;
    if !gateway.is_usable() {
        return Err(ValidationError::GatewayNotUsable {
            gateway: gateway.id.to_string(),
        }
        .into());
    }
    if spec.network_id.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "network_id" }.into());
    }
    existing_network(store, &spec.network_id)?;
    if store
        .connection_by_gateway_and_network(&spec.gateway_id, &spec.network_id)?
        .is_some()
    {
        return Err(ValidationError::DuplicateConnection {
            gateway: spec.gateway_id.to_string(),
            network: spec.network_id.clone(),
        }
        .into());
    }
    Ok(gateway)
}

pub fn connection_for_delete(
    store: &dyn L2gwStore,
    id: &GatewayConnectionId,
) -> PluginResult<GatewayConnection> {
    store
        .get_gateway_connection(id)?
        .ok_or_else(|| PluginError::not_found("gateway connection", id))
}

/// Parses a remote connection's segmentation id.
pub fn parse_seg_id(raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidSegmentationId {
            value: raw.to_string(),
        })
}

/// Checks a remote connection request and returns its parsed segmentation
/// id together with the resolved remote gateway.
pub fn remote_connection_for_create(
    store: &dyn L2gwStore,
    spec: &RemoteGatewayConnectionSpec,
) -> PluginResult<(u32, RemoteGateway)> {
    if spec.network.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "network" }.into());
    }
    let seg_id = parse_seg_id(&spec.seg_id)?;
    existing_gateway(store, &spec.gateway)?;
    existing_network(store, &spec.network)?;
    let remote = store
        .get_remote_gateway(&spec.remote_gateway)?
        .ok_or_else(|| PluginError::not_found("remote gateway", spec.remote_gateway))?;
    Ok((seg_id, remote))
}

pub fn remote_gateway_for_delete(
    store: &dyn L2gwStore,
    id: &RemoteGatewayId,
) -> PluginResult<RemoteGateway> {
    let remote = store
        .get_remote_gateway(id)?
        .ok_or_else(|| PluginError::not_found("remote gateway", id))?;
    if !store.remote_connections_by_remote_gateway(id)?.is_empty() {
        return Err(ValidationError::RemoteGatewayInUse {
            remote_gateway: id.to_string(),
        }
        .into());
    }
    Ok(remote)
}

pub fn existing_network(store: &dyn L2gwStore, network: &str) -> PluginResult<()> {
    if store.network_exists(network)? {
        Ok(())
    } else {
        Err(ValidationError::NetworkNotFound {
            network: network.to_string(),
        }
        .into())
    }
}

fn existing_gateway(store: &dyn L2gwStore, id: &GatewayId) -> PluginResult<Gateway> {
    store
        .get_gateway(id)?
        .ok_or_else(|| PluginError::not_found("gateway", id))
}
