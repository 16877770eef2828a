//! Typed entity identifiers.
//!
//! Every persisted entity is identified by an opaque UUID. Wrapping each
//! family in its own newtype keeps a gateway id from being passed where a
//! connection id is expected.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| ParseError::InvalidId {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

entity_id!(
    /// Identifier of a locally managed gateway.
    GatewayId,
    "gateway"
);
entity_id!(
    /// Identifier of a device attached to a gateway.
    DeviceId,
    "device"
);
entity_id!(
    /// Identifier of a gateway-to-network binding.
    GatewayConnectionId,
    "gateway connection"
);
entity_id!(
    /// Identifier of a peer gateway reachable by address.
    RemoteGatewayId,
    "remote gateway"
);
entity_id!(
    /// Identifier of a binding between a local gateway/network and a remote gateway.
    RemoteGatewayConnectionId,
    "remote gateway connection"
);
entity_id!(
    /// Identifier of a remote MAC entry.
    RemoteMacId,
    "remote mac"
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_display() {
        let raw = "6f1c2d3e-4b5a-4c6d-8e7f-0123456789ab";
        let id: GatewayId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn test_parse_error_names_kind() {
        let err = "nope".parse::<RemoteMacId>().unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidId {
                kind: "remote mac",
                value: "nope".to_string()
            }
        );
        assert_eq!(err.to_string(), "invalid remote mac id: nope");
    }

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(GatewayId::new_v4(), GatewayId::new_v4());
    }

    #[test]
    fn test_serde_transparent() {
        let id = RemoteGatewayId::new_v4();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: RemoteGatewayId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
