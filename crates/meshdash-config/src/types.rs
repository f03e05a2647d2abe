//! Configuration types

use meshdash_core::{AppDescriptor, DEFAULT_TITLE};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// CouchDB base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Mesh database name
    #[serde(default = "default_dbname")]
    pub dbname: String,

    /// Admin connection, preferred over `url` for replication queries
    #[serde(default)]
    pub admin: Option<AdminConfig>,

    /// Dashboard server
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Replication status client
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Applications announced as `app.load` events at startup
    #[serde(default)]
    pub apps: Vec<AppDescriptor>,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// URL used to query replication rules: `admin.url`, else `url`
    pub fn replication_url(&self) -> Option<&str> {
        self.admin
            .as_ref()
            .and_then(|admin| admin.url.as_deref())
            .or(self.url.as_deref())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            dbname: default_dbname(),
            admin: None,
            dashboard: DashboardConfig::default(),
            replication: ReplicationConfig::default(),
            apps: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_dbname() -> String {
    "steelmesh".to_string()
}

/// Admin connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    /// Admin URL (may embed credentials)
    #[serde(default)]
    pub url: Option<String>,
}

/// Dashboard server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Bind address
    pub host: IpAddr,

    /// Listen port
    pub port: u16,

    /// `Cache-Control` max-age for static assets
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// Page title
    pub title: String,

    /// Root of on-disk view templates
    pub views_dir: PathBuf,

    /// Static asset directory, served under `/static`
    pub static_dir: PathBuf,

    /// Directory of per-page JSON data files
    pub pagedata_dir: PathBuf,

    /// Core plugin directory
    pub plugin_dir: PathBuf,

    /// Extension of rich templates, tried before `.html`
    pub template_extension: String,
}

impl DashboardConfig {
    /// Socket address to bind
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3274,
            max_age: Duration::ZERO,
            title: DEFAULT_TITLE.to_string(),
            views_dir: PathBuf::from("views"),
            static_dir: PathBuf::from("_static"),
            pagedata_dir: PathBuf::from("pagedata"),
            plugin_dir: PathBuf::from("plugins/dash"),
            template_extension: "tmpl".to_string(),
        }
    }
}

/// Replication status client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplicationConfig {
    /// HTTP timeout for the replication status query
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
