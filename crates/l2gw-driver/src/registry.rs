//! Service-provider parsing and driver selection.

use crate::driver::ServiceDriver;
use crate::error::{DriverResult, RegistryError};
use crate::logging::{LoggingDriver, LOGGING_DRIVER};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Service type every L2 gateway provider must declare.
pub const L2GW_SERVICE_TYPE: &str = "L2GW";

/// One configured driver, parsed from `SERVICE_TYPE:name:driver[:default]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProvider {
    pub service_type: String,
    pub name: String,
    pub driver: String,
    pub default: bool,
}

impl FromStr for ServiceProvider {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let default = match parts.as_slice() {
            [_, _, _] => false,
            [_, _, _, "default"] => true,
            _ => return Err(RegistryError::InvalidProvider(s.to_string())),
        };
        if parts[..3].iter().any(|p| p.is_empty()) {
            return Err(RegistryError::InvalidProvider(s.to_string()));
        }
        if parts[0] != L2GW_SERVICE_TYPE {
            return Err(RegistryError::WrongServiceType {
                provider: parts[1].to_string(),
                expected: L2GW_SERVICE_TYPE,
                found: parts[0].to_string(),
            });
        }

        Ok(Self {
            service_type: parts[0].to_string(),
            name: parts[1].to_string(),
            driver: parts[2].to_string(),
            default,
        })
    }
}

impl fmt::Display for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.service_type, self.name, self.driver)?;
        if self.default {
            write!(f, ":default")?;
        }
        Ok(())
    }
}

type Constructor = Box<dyn Fn(&ServiceProvider) -> DriverResult<Arc<dyn ServiceDriver>> + Send + Sync>;

/// Maps driver paths to constructors.
pub struct DriverFactory {
    constructors: HashMap<String, Constructor>,
}

impl DriverFactory {
    /// Creates a factory with no drivers.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Creates a factory that knows the built-in drivers.
    pub fn builtin() -> Self {
        let mut factory = Self::empty();
        factory.register(LOGGING_DRIVER, |provider| {
            Ok(Arc::new(LoggingDriver::new(provider.name.clone())) as Arc<dyn ServiceDriver>)
        });
        factory
    }

    pub fn register<F>(&mut self, driver: impl Into<String>, constructor: F)
    where
        F: Fn(&ServiceProvider) -> DriverResult<Arc<dyn ServiceDriver>> + Send + Sync + 'static,
    {
        self.constructors.insert(driver.into(), Box::new(constructor));
    }

    pub fn build(&self, provider: &ServiceProvider) -> Result<Arc<dyn ServiceDriver>, RegistryError> {
        let constructor = self
            .constructors
            .get(&provider.driver)
            .ok_or_else(|| RegistryError::UnknownDriver {
                provider: provider.name.clone(),
                driver: provider.driver.clone(),
            })?;
        constructor(provider).map_err(|source| RegistryError::Construct {
            provider: provider.name.clone(),
            source,
        })
    }
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut drivers: Vec<_> = self.constructors.keys().collect();
        drivers.sort();
        f.debug_struct("DriverFactory").field("drivers", &drivers).finish()
    }
}

/// The set of loaded drivers and the one that serves requests.
///
/// Built once at startup and handed to the orchestration core. Only the
/// default driver is ever invoked.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn ServiceDriver>>,
    default_provider: String,
}

impl DriverRegistry {
    /// Builds a registry from configured providers.
    ///
    /// A lone provider is the default even when not marked; with several,
    /// exactly one must carry `:default`.
    pub fn from_providers(
        providers: &[ServiceProvider],
        factory: &DriverFactory,
    ) -> Result<Self, RegistryError> {
        if providers.is_empty() {
            return Err(RegistryError::NoProviders);
        }

        let mut drivers = BTreeMap::new();
        for provider in providers {
            if drivers.contains_key(&provider.name) {
                return Err(RegistryError::DuplicateProvider(provider.name.clone()));
            }
            let driver = factory.build(provider)?;
            drivers.insert(provider.name.clone(), driver);
        }

        let defaults: Vec<String> = providers
            .iter()
            .filter(|p| p.default)
            .map(|p| p.name.clone())
            .collect();
        let default_provider = match defaults.as_slice() {
            [one] => one.clone(),
            [] if providers.len() == 1 => providers[0].name.clone(),
            [] => return Err(RegistryError::NoDefault(drivers.keys().cloned().collect())),
            _ => return Err(RegistryError::MultipleDefaults(defaults)),
        };

        info!(provider = %default_provider, "L2 gateway service using service driver");
        if drivers.len() > 1 {
            warn!(
                providers = ?drivers.keys().collect::<Vec<_>>(),
                "Multiple drivers configured for L2 gateway, running multiple drivers in parallel is not supported"
            );
        }

        Ok(Self {
            drivers,
            default_provider,
        })
    }

    /// Registry holding exactly one driver.
    pub fn single(name: impl Into<String>, driver: Arc<dyn ServiceDriver>) -> Self {
        let name = name.into();
        let mut drivers = BTreeMap::new();
        drivers.insert(name.clone(), driver);
        Self {
            drivers,
            default_provider: name,
        }
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn default_driver(&self) -> &Arc<dyn ServiceDriver> {
        // The constructors guarantee the default provider is present.
        &self.drivers[&self.default_provider]
    }

    pub fn get(&self, provider: &str) -> Option<&Arc<dyn ServiceDriver>> {
        self.drivers.get(provider)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("providers", &self.provider_names())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}
