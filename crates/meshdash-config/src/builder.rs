//! Configuration builder

use crate::types::{AdminConfig, Config};
use meshdash_core::AppDescriptor;
use std::path::PathBuf;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CouchDB base URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Set the admin URL
    pub fn admin_url(mut self, url: impl Into<String>) -> Self {
        self.config.admin = Some(AdminConfig {
            url: Some(url.into()),
        });
        self
    }

    /// Set the mesh database name
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.config.dbname = dbname.into();
        self
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.config.dashboard.port = port;
        self
    }

    /// Set the views root
    pub fn views_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dashboard.views_dir = dir.into();
        self
    }

    /// Set the page data directory
    pub fn pagedata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dashboard.pagedata_dir = dir.into();
        self
    }

    /// Set the core plugin directory
    pub fn plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dashboard.plugin_dir = dir.into();
        self
    }

    /// Set the static asset directory
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dashboard.static_dir = dir.into();
        self
    }

    /// Announce an application at startup
    pub fn add_app(mut self, app: AppDescriptor) -> Self {
        self.config.apps.push(app);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> meshdash_core::Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .url("http://localhost:5984")
            .dbname("mesh")
            .port(8080)
            .add_app(AppDescriptor::new("geo", "/srv/geo"))
            .build()
            .unwrap();

        assert_eq!(config.dbname, "mesh");
        assert_eq!(config.dashboard.port, 8080);
        assert_eq!(config.apps.len(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = ConfigBuilder::new().url("::nope::").build();
        assert!(result.is_err());
    }
}
