//! Plugin registry
//!
//! Holds the page loaders, view mappings and navigation contributed by
//! plugins. All mutation goes through [`RegistryCommand`]s; each command is
//! applied under a single write lock so a concurrent page render sees either
//! the whole registration or none of it.

use crate::traits::{PageLoader, PluginRegistration};
use meshdash_core::NavItem;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The closed set of registry mutations
#[derive(Debug, Clone)]
pub enum RegistryCommand {
    /// Merge a plugin's loaders, views and nav
    RegisterPlugin {
        /// Plugin name
        name: String,
        /// Contributed data
        registration: PluginRegistration,
        /// Where the module was loaded from
        module_path: Option<String>,
    },
    /// Remove every nav entry with this url; no-op when absent
    RemoveNav {
        /// Url to match exactly
        url: Option<String>,
    },
    /// Remove a page loader
    DropLoader {
        /// Page id
        key: String,
    },
    /// Remove a view mapping
    DropView {
        /// Page id
        key: String,
    },
}

#[derive(Default)]
struct Registrations {
    loaders: HashMap<String, Arc<dyn PageLoader>>,
    views: HashMap<String, String>,
    nav: Vec<NavItem>,
    plugins: Vec<String>,
}

/// Shared registry of plugin contributions
#[derive(Clone, Default)]
pub struct PluginRegistry {
    inner: Arc<RwLock<Registrations>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("PluginRegistry")
            .field("loaders", &inner.loaders.len())
            .field("views", &inner.views.len())
            .field("nav", &inner.nav.len())
            .field("plugins", &inner.plugins)
            .finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one command
    pub fn apply(&self, command: RegistryCommand) {
        match command {
            RegistryCommand::RegisterPlugin {
                name,
                registration,
                module_path,
            } => {
                self.register_plugin(&name, registration);
                debug!(
                    plugin = %name,
                    module = module_path.as_deref().unwrap_or("-"),
                    "Plugin registration applied"
                );
            }
            RegistryCommand::RemoveNav { url } => self.remove_nav(url.as_deref()),
            RegistryCommand::DropLoader { key } => self.drop_loader(&key),
            RegistryCommand::DropView { key } => self.drop_view(&key),
        }
    }

    /// Merge a registration. Loaders and views overwrite by key; nav entries
    /// are appended and the whole sequence re-sorted by title.
    pub fn register_plugin(&self, name: &str, registration: PluginRegistration) {
        let mut inner = self.inner.write();

        inner.loaders.extend(registration.loaders);
        inner.views.extend(registration.views);
        inner.nav.extend(registration.nav);
        // Stable: equal titles keep insertion order.
        inner.nav.sort_by(|a, b| a.title.cmp(&b.title));

        if !inner.plugins.iter().any(|p| p == name) {
            inner.plugins.push(name.to_string());
        }
    }

    /// Remove every nav entry whose url equals `url`
    pub fn remove_nav(&self, url: Option<&str>) {
        let Some(url) = url else {
            return;
        };

        debug!(url = %url, "Removing nav");
        self.inner.write().nav.retain(|item| item.url != url);
    }

    /// Remove the loader for `key`, if any
    pub fn drop_loader(&self, key: &str) {
        if self.inner.write().loaders.remove(key).is_some() {
            debug!(page = %key, "Dropped page loader");
        }
    }

    /// Remove the view mapping for `key`, if any
    pub fn drop_view(&self, key: &str) {
        if self.inner.write().views.remove(key).is_some() {
            debug!(page = %key, "Dropped view");
        }
    }

    /// Loader registered for `page`
    pub fn lookup_loader(&self, page: &str) -> Option<Arc<dyn PageLoader>> {
        self.inner.read().loaders.get(page).cloned()
    }

    /// Template registered for `page`
    pub fn lookup_view(&self, page: &str) -> Option<String> {
        self.inner.read().views.get(page).cloned()
    }

    /// Copy of the navigation sequence
    pub fn snapshot_nav(&self) -> Vec<NavItem> {
        self.inner.read().nav.clone()
    }

    /// Names of registered plugins, in registration order
    pub fn plugins(&self) -> Vec<String> {
        self.inner.read().plugins.clone()
    }
}
