//! Southbound driver interface for the L2 gateway service.
//!
//! - [`ServiceDriver`]: the fixed operation set the orchestration core
//!   invokes around its persistence transactions
//! - Payloads the core assembles for the driver ([`RemoteUnknown`],
//!   [`UcastMacRemote`], [`PortMac`])
//! - [`DriverRegistry`]: drivers loaded from configured
//!   [`ServiceProvider`]s, with one default
//! - [`LoggingDriver`]: built-in driver that only logs

mod driver;
mod error;
mod logging;
mod payload;
mod registry;

pub use driver::ServiceDriver;
pub use error::{DriverError, DriverResult, RegistryError};
pub use logging::{LoggingDriver, LOGGING_DRIVER};
pub use payload::{PortMac, RemoteUnknown, UcastMacRemote};
pub use registry::{DriverFactory, DriverRegistry, ServiceProvider, L2GW_SERVICE_TYPE};
