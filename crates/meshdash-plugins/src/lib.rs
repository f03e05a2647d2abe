//! # meshdash Plugin System
//!
//! Dashboard plugins contribute navigation, page-data loaders and views.
//! This crate provides:
//! - The [`DashboardPlugin`] contract and the capabilities handed to plugins
//! - Swappable discovery (compiled-in lists and declarative manifests)
//! - A loader that connects modules in isolated tasks
//! - The registry and the registration bus that feeds it

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod bus;
pub mod discovery;
pub mod host;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod routes;
pub mod status;
pub mod traits;

pub use bus::{relay, RegistryBus};
pub use discovery::{ChainedDiscovery, PluginDiscovery, PluginModule, StaticDiscovery};
pub use host::PluginHost;
pub use loader::PluginLoader;
pub use manifest::{ManifestDiscovery, ManifestPlugin, PluginManifest};
pub use registry::{PluginRegistry, RegistryCommand};
pub use routes::{message_body, route_fn, RouteHandler, RouteTable};
pub use status::{StatusPlugin, STATUS_ROUTE};
pub use traits::{loader_fn, DashboardPlugin, PageData, PageLoader, PluginRegistration, StaticLoader};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::host::PluginHost;
    pub use crate::loader::PluginLoader;
    pub use crate::registry::{PluginRegistry, RegistryCommand};
    pub use crate::routes::{route_fn, RouteTable};
    pub use crate::traits::{loader_fn, DashboardPlugin, PageData, PageLoader, PluginRegistration};
}
