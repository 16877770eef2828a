//! L2 gateway orchestration service.
//!
//! [`L2GatewayPlugin`] sequences every operation on gateways, gateway
//! connections, remote gateways, remote connections and remote MACs across
//! the persistence layer ([`l2gw_db::L2gwStore`]) and the southbound driver
//! ([`l2gw_driver::ServiceDriver`]), and replaces gateways whose switches
//! sit on a failed OVSDB server.
//!
//! - [`api`]: JSON request envelope and dispatch
//! - [`audit`]: structured audit records on the `audit` tracing target
//! - [`config`]: TOML service configuration
//! - [`failover`]: gateway replacement after an OVSDB server failure

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod failover;
pub mod gateway;
pub mod plugin;
pub mod remote;
pub mod validate;

pub use api::{dispatch, Request, Response};
pub use config::ServiceConfig;
pub use error::{Compensation, PluginError, PluginResult, ValidationError};
pub use failover::{FailoverReport, GatewayReplacement};
pub use plugin::{L2GatewayPlugin, PluginStats, PluginStatsSnapshot};
pub use remote::RemoteMacAck;
