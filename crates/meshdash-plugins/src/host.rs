//! Capabilities handed to plugins

use crate::bus::RegistryBus;
use crate::routes::RouteTable;
use meshdash_core::{DashboardHandle, Platform};

/// Everything a plugin may touch while connecting or disconnecting
#[derive(Debug, Clone)]
pub struct PluginHost {
    /// Server capability: add or remove routes
    pub routes: RouteTable,
    /// Platform lifecycle events
    pub platform: Platform,
    /// Dashboard lifecycle state
    pub dashboard: DashboardHandle,
    /// Registration bus for nav/loader/view removal
    pub bus: RegistryBus,
}

impl PluginHost {
    /// Bundle the host capabilities
    pub fn new(
        routes: RouteTable,
        platform: Platform,
        dashboard: DashboardHandle,
        bus: RegistryBus,
    ) -> Self {
        Self {
            routes,
            platform,
            dashboard,
            bus,
        }
    }
}
