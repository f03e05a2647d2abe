//! Plugin loader
//!
//! Discovers plugin modules and connects them. Every connect runs in its own
//! task with panics caught, so one broken module never takes down the others
//! or the loader itself.

use crate::discovery::{PluginDiscovery, PluginModule};
use crate::host::PluginHost;
use crate::registry::RegistryCommand;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use meshdash_core::{Error, Result};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Connects plugin modules to the dashboard
#[derive(Clone)]
pub struct PluginLoader {
    discovery: Arc<dyn PluginDiscovery>,
    host: PluginHost,
    loaded: Arc<DashMap<String, PluginModule>>,
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("host", &self.host)
            .field("loaded", &self.loaded())
            .finish()
    }
}

impl PluginLoader {
    /// Create a loader using `discovery` to find modules
    pub fn new(discovery: Arc<dyn PluginDiscovery>, host: PluginHost) -> Self {
        Self {
            discovery,
            host,
            loaded: Arc::new(DashMap::new()),
        }
    }

    /// Capabilities handed to plugins
    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    /// Lazily discover modules in each directory, in order. A directory that
    /// fails discovery is logged and contributes nothing.
    pub fn discover(&self, dirs: &[PathBuf]) -> BoxStream<'static, PluginModule> {
        let discovery = Arc::clone(&self.discovery);

        stream::iter(dirs.to_vec())
            .then(move |dir| {
                let discovery = Arc::clone(&discovery);
                async move {
                    match discovery.discover(&dir).await {
                        Ok(modules) => modules,
                        Err(e) => {
                            warn!(dir = %dir.display(), error = %e, "Plugin discovery failed");
                            Vec::new()
                        }
                    }
                }
            })
            .flat_map(|modules| stream::iter(modules))
            .boxed()
    }

    /// Discover the modules in `dir` and connect each in its own task
    pub async fn find(&self, dir: impl AsRef<Path>) -> Vec<JoinHandle<Result<()>>> {
        let dirs = [dir.as_ref().to_path_buf()];
        let mut modules = self.discover(&dirs);
        let mut handles = Vec::new();

        while let Some(module) = modules.next().await {
            let loader = self.clone();
            handles.push(tokio::spawn(
                async move { loader.connect_plugin(module).await },
            ));
        }

        handles
    }

    /// Connect each module in its own task without waiting for any of them
    pub fn spawn_all(&self, modules: Vec<PluginModule>) -> Vec<JoinHandle<Result<()>>> {
        modules
            .into_iter()
            .map(|module| {
                let loader = self.clone();
                tokio::spawn(async move { loader.connect_plugin(module).await })
            })
            .collect()
    }

    /// Connect a compiled-in plugin list; returns how many connected
    pub async fn load_all(&self, modules: Vec<PluginModule>) -> usize {
        futures::future::join_all(self.spawn_all(modules))
            .await
            .into_iter()
            .filter(|outcome| matches!(outcome, Ok(Ok(()))))
            .count()
    }

    /// Connect one module and send its registration to the registry.
    ///
    /// A module whose name is already held by a module from another path is
    /// rejected; the first one stays loaded and can still be unloaded.
    pub async fn connect_plugin(&self, module: PluginModule) -> Result<()> {
        let name = module.name().to_string();
        let module_path = module.module_path();

        if let Some(holder) = self.holder_of(&name, &module_path) {
            return Err(self.duplicate(&name, &module_path, &holder));
        }

        let outcome = AssertUnwindSafe(module.connect(&self.host))
            .catch_unwind()
            .await;

        let registration = match outcome {
            Ok(Ok(registration)) => registration,
            Ok(Err(e)) => {
                error!(plugin = %name, module = %module_path, error = %e, "Dashboard plugin failed to connect");
                return Err(Error::plugin(name, e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(plugin = %name, module = %module_path, panic = %message, "Dashboard plugin panicked while connecting");
                return Err(Error::plugin(name, format!("panicked: {message}")));
            }
        };

        // Two same-named modules may have connected concurrently.
        match self.loaded.entry(name.clone()) {
            Entry::Occupied(entry) if entry.get().module_path() != module_path => {
                let holder = entry.get().module_path();
                drop(entry);
                return Err(self.duplicate(&name, &module_path, &holder));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(module);
            }
            Entry::Vacant(entry) => {
                entry.insert(module);
            }
        }

        self.host.bus.send(RegistryCommand::RegisterPlugin {
            name: name.clone(),
            registration,
            module_path: Some(module_path.clone()),
        })?;

        info!(plugin = %name, "dashboard plugin ({module_path}) loaded successfully");
        Ok(())
    }

    fn holder_of(&self, name: &str, module_path: &str) -> Option<String> {
        self.loaded
            .get(name)
            .map(|entry| entry.value().module_path())
            .filter(|holder| holder != module_path)
    }

    fn duplicate(&self, name: &str, module_path: &str, holder: &str) -> Error {
        warn!(
            plugin = %name,
            module = %module_path,
            loaded_from = %holder,
            "Dashboard plugin name already in use, module skipped"
        );
        Error::plugin(name, format!("name already loaded from {holder}"))
    }

    /// Disconnect a loaded module and forget it; returns `false` if unknown
    pub async fn unload(&self, name: &str) -> Result<bool> {
        let Some((_, module)) = self.loaded.remove(name) else {
            return Ok(false);
        };

        module.disconnect(&self.host).await?;
        info!(plugin = %name, "Dashboard plugin unloaded");
        Ok(true)
    }

    /// Names of connected modules, sorted
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{drain, RegistryBus};
    use crate::discovery::StaticDiscovery;
    use crate::registry::PluginRegistry;
    use crate::routes::RouteTable;
    use crate::traits::{DashboardPlugin, PluginRegistration};
    use async_trait::async_trait;
    use meshdash_core::{DashboardHandle, Platform};
    use tokio::sync::mpsc::UnboundedReceiver;

    enum Behaviour {
        Register(&'static str),
        Fail,
        Panic,
    }

    struct TestPlugin {
        name: &'static str,
        behaviour: Behaviour,
    }

    impl TestPlugin {
        fn module(name: &'static str, behaviour: Behaviour) -> PluginModule {
            Arc::new(Self { name, behaviour })
        }
    }

    #[async_trait]
    impl DashboardPlugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }

        async fn connect(&self, _host: &PluginHost) -> Result<PluginRegistration> {
            match self.behaviour {
                Behaviour::Register(url) => {
                    Ok(PluginRegistration::new().with_nav(self.name, url))
                }
                Behaviour::Fail => Err(Error::Runtime("boom".to_string())),
                Behaviour::Panic => panic!("plugin exploded"),
            }
        }

        async fn disconnect(&self, host: &PluginHost) -> Result<()> {
            if let Behaviour::Register(url) = self.behaviour {
                host.bus.remove_nav(url)?;
            }
            Ok(())
        }
    }

    fn loader(discovery: StaticDiscovery) -> (PluginLoader, UnboundedReceiver<RegistryCommand>) {
        let (bus, rx) = RegistryBus::channel();
        let host = PluginHost::new(
            RouteTable::new(),
            Platform::new(),
            DashboardHandle::default(),
            bus,
        );
        (PluginLoader::new(Arc::new(discovery), host), rx)
    }

    #[tokio::test]
    async fn test_discover_across_directories() {
        let discovery = StaticDiscovery::new()
            .with_module("a", TestPlugin::module("one", Behaviour::Register("/one")))
            .with_module("b", TestPlugin::module("two", Behaviour::Register("/two")));
        let (loader, _rx) = loader(discovery);

        let names: Vec<String> = loader
            .discover(&[PathBuf::from("a"), PathBuf::from("missing"), PathBuf::from("b")])
            .map(|m| m.name().to_string())
            .collect()
            .await;

        assert_eq!(names, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_find_isolates_failures_and_panics() {
        let discovery = StaticDiscovery::new()
            .with_module("dash", TestPlugin::module("good", Behaviour::Register("/good")))
            .with_module("dash", TestPlugin::module("bad", Behaviour::Fail))
            .with_module("dash", TestPlugin::module("wild", Behaviour::Panic))
            .with_module("dash", TestPlugin::module("also-good", Behaviour::Register("/also")));
        let (loader, mut rx) = loader(discovery);

        let handles = loader.find("dash").await;
        assert_eq!(handles.len(), 4);

        let mut failures = 0;
        for handle in handles {
            if handle.await.unwrap().is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 2);

        let registry = PluginRegistry::new();
        assert_eq!(drain(&mut rx, &registry), 2);

        let urls: Vec<String> = registry.snapshot_nav().into_iter().map(|n| n.url).collect();
        assert_eq!(urls, vec!["/also", "/good"]);
        assert_eq!(loader.loaded(), vec!["also-good", "good"]);
    }

    #[tokio::test]
    async fn test_connect_plugin_reports_panic() {
        let (loader, _rx) = loader(StaticDiscovery::new());

        let err = loader
            .connect_plugin(TestPlugin::module("wild", Behaviour::Panic))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("plugin exploded"));
        assert!(loader.loaded().is_empty());
    }

    /// Same name as another module, loaded from its own path
    struct Named {
        name: &'static str,
        path: &'static str,
        url: &'static str,
    }

    #[async_trait]
    impl DashboardPlugin for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn module_path(&self) -> String {
            self.path.to_string()
        }

        async fn connect(&self, _host: &PluginHost) -> Result<PluginRegistration> {
            Ok(PluginRegistration::new().with_nav(self.name, self.url))
        }

        async fn disconnect(&self, host: &PluginHost) -> Result<()> {
            host.bus.remove_nav(self.url)
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_first_module() {
        let (loader, mut rx) = loader(StaticDiscovery::new());
        let registry = PluginRegistry::new();

        let first: PluginModule = Arc::new(Named {
            name: "reports",
            path: "plugins/dash/reports.yaml",
            url: "/first",
        });
        let second: PluginModule = Arc::new(Named {
            name: "reports",
            path: "plugins/dash/other.yaml",
            url: "/second",
        });

        loader.connect_plugin(first).await.unwrap();
        assert!(loader.connect_plugin(second).await.is_err());
        assert_eq!(loader.loaded(), vec!["reports"]);

        drain(&mut rx, &registry);
        let urls: Vec<String> = registry.snapshot_nav().into_iter().map(|n| n.url).collect();
        assert_eq!(urls, vec!["/first"]);

        assert!(loader.unload("reports").await.unwrap());
        drain(&mut rx, &registry);
        assert!(registry.snapshot_nav().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_and_unload() {
        let (loader, mut rx) = loader(StaticDiscovery::new());
        let registry = PluginRegistry::new();

        let connected = loader
            .load_all(vec![
                TestPlugin::module("status", Behaviour::Register("/status")),
                TestPlugin::module("bad", Behaviour::Fail),
            ])
            .await;
        assert_eq!(connected, 1);
        drain(&mut rx, &registry);
        assert_eq!(registry.snapshot_nav().len(), 1);

        assert!(loader.unload("status").await.unwrap());
        assert!(!loader.unload("status").await.unwrap());
        drain(&mut rx, &registry);
        assert!(registry.snapshot_nav().is_empty());
    }
}
