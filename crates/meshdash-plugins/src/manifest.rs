//! Declarative plugin manifests
//!
//! A plugin directory may contain `*.yaml`, `*.yml`, `*.toml` or `*.json`
//! manifests describing views, nav entries and static page data.

use crate::discovery::{PluginDiscovery, PluginModule};
use crate::host::PluginHost;
use crate::traits::{DashboardPlugin, PageData, PluginRegistration, StaticLoader};
use async_trait::async_trait;
use meshdash_config::ConfigFormat;
use meshdash_core::{Error, NavItem, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parsed manifest file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    /// Plugin name; defaults to the file stem
    pub name: Option<String>,
    /// Page id -> template id
    pub views: HashMap<String, String>,
    /// Navigation entries
    pub nav: Vec<NavItem>,
    /// Page id -> static page data
    pub data: HashMap<String, PageData>,
}

impl PluginManifest {
    /// Parse a manifest in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse manifest YAML: {e}"))),
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse manifest TOML: {e}"))),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse manifest JSON: {e}"))),
        }
    }

    /// Read and parse a manifest file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, format)
    }
}

/// Plugin built from a manifest
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    name: String,
    path: PathBuf,
    manifest: PluginManifest,
}

impl ManifestPlugin {
    /// Create a plugin from a parsed manifest found at `path`
    pub fn new(path: impl Into<PathBuf>, manifest: PluginManifest) -> Self {
        let path = path.into();
        let name = manifest.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "manifest".to_string())
        });

        Self {
            name,
            path,
            manifest,
        }
    }
}

#[async_trait]
impl DashboardPlugin for ManifestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn module_path(&self) -> String {
        self.path.display().to_string()
    }

    async fn connect(&self, _host: &PluginHost) -> Result<PluginRegistration> {
        let mut registration = PluginRegistration::new();

        for (page, template) in &self.manifest.views {
            registration = registration.with_view(page.clone(), template.clone());
        }
        for item in &self.manifest.nav {
            registration = registration.with_nav(item.title.clone(), item.url.clone());
        }
        for (page, data) in &self.manifest.data {
            registration =
                registration.with_loader(page.clone(), Arc::new(StaticLoader::new(data.clone())));
        }

        Ok(registration)
    }

    async fn disconnect(&self, host: &PluginHost) -> Result<()> {
        for item in &self.manifest.nav {
            host.bus.remove_nav(item.url.clone())?;
        }
        for page in self.manifest.views.keys() {
            host.bus.drop_view(page.clone())?;
        }
        for page in self.manifest.data.keys() {
            host.bus.drop_loader(page.clone())?;
        }
        Ok(())
    }
}

/// Scans a directory for manifest files
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestDiscovery;

impl ManifestDiscovery {
    /// Create a manifest scanner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginDiscovery for ManifestDiscovery {
    async fn discover(&self, dir: &Path) -> Result<Vec<PluginModule>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Plugin directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && ConfigFormat::from_path(&path).is_ok() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut modules: Vec<PluginModule> = Vec::with_capacity(paths.len());
        for path in paths {
            match PluginManifest::from_file(&path).await {
                Ok(manifest) => modules.push(Arc::new(ManifestPlugin::new(path, manifest))),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping plugin manifest"),
            }
        }

        Ok(modules)
    }
}
