//! Plugin discovery
//!
//! Turns a plugin directory into a list of plugin modules. Discovery is a
//! trait so the compiled-in list and the manifest scanner can be swapped or
//! chained.

use crate::traits::DashboardPlugin;
use async_trait::async_trait;
use meshdash_core::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// A discovered plugin module
pub type PluginModule = Arc<dyn DashboardPlugin>;

/// Finds plugin modules in a directory
#[async_trait]
pub trait PluginDiscovery: Send + Sync {
    /// Modules found under `dir`. A missing directory is not an error.
    async fn discover(&self, dir: &Path) -> Result<Vec<PluginModule>>;
}

/// Compiled-in plugins, keyed by the directory they are served for
#[derive(Clone, Default)]
pub struct StaticDiscovery {
    modules: HashMap<PathBuf, Vec<PluginModule>>,
}

impl std::fmt::Debug for StaticDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dirs: Vec<_> = self.modules.keys().collect();
        f.debug_struct("StaticDiscovery")
            .field("dirs", &dirs)
            .finish()
    }
}

impl StaticDiscovery {
    /// Create an empty discovery
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `module` when `dir` is scanned
    pub fn with_module(mut self, dir: impl Into<PathBuf>, module: PluginModule) -> Self {
        self.modules.entry(dir.into()).or_default().push(module);
        self
    }
}

#[async_trait]
impl PluginDiscovery for StaticDiscovery {
    async fn discover(&self, dir: &Path) -> Result<Vec<PluginModule>> {
        Ok(self.modules.get(dir).cloned().unwrap_or_default())
    }
}

/// Runs several discoveries and concatenates their modules
#[derive(Clone, Default)]
pub struct ChainedDiscovery {
    sources: Vec<Arc<dyn PluginDiscovery>>,
}

impl std::fmt::Debug for ChainedDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedDiscovery")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl ChainedDiscovery {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a discovery to the chain
    pub fn push(mut self, source: Arc<dyn PluginDiscovery>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl PluginDiscovery for ChainedDiscovery {
    async fn discover(&self, dir: &Path) -> Result<Vec<PluginModule>> {
        let mut modules = Vec::new();

        for source in &self.sources {
            match source.discover(dir).await {
                Ok(found) => modules.extend(found),
                Err(e) => warn!(dir = %dir.display(), error = %e, "Plugin discovery failed"),
            }
        }

        Ok(modules)
    }
}
