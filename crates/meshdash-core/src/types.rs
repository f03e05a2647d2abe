//! Common types used throughout the dashboard

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Platform lifecycle status as reported by `status` events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Platform is down
    Shutdown,
    /// Platform is booting
    Starting,
    /// Platform is serving
    Online,
    /// Platform is going down
    Stopping,
    /// Any status string the platform emits that has no dedicated variant
    Other(String),
}

impl Status {
    /// String form used on the wire and in templates
    pub fn as_str(&self) -> &str {
        match self {
            Status::Shutdown => "shutdown",
            Status::Starting => "starting",
            Status::Online => "online",
            Status::Stopping => "stopping",
            Status::Other(s) => s,
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "shutdown" => Status::Shutdown,
            "starting" => Status::Starting,
            "online" => Status::Online,
            "stopping" => Status::Stopping,
            _ => Status::Other(value),
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Status::from(value.to_string())
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle view of the platform that every page render sees.
///
/// `online` and `shutdown` are derived from `status` and only change
/// through [`DashboardState::apply_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Last status reported by the platform
    pub status: Status,
    /// `status == online`
    pub online: bool,
    /// `status == shutdown`
    pub shutdown: bool,
    /// Whether the dashboard HTTP listener is bound
    pub serverup: bool,
}

impl DashboardState {
    /// Record a new platform status
    pub fn apply_status(&mut self, status: Status) {
        self.online = status == Status::Online;
        self.shutdown = status == Status::Shutdown;
        self.status = status;
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            status: Status::Shutdown,
            online: false,
            shutdown: true,
            serverup: false,
        }
    }
}

/// A navigation entry contributed by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    /// Label shown in the navigation bar
    pub title: String,
    /// Link target, also the removal key
    pub url: String,
}

impl NavItem {
    /// Create a new nav item
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Replication role of the local node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Accepts writes; the default when no active replication targets the mesh db
    #[default]
    Primary,
    /// Receives an active replication into the mesh db
    Secondary,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Primary => f.write_str("primary"),
            Mode::Secondary => f.write_str("secondary"),
        }
    }
}

/// Application descriptor carried by `app.load` platform events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Application identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Application root on disk
    #[serde(
        default,
        alias = "basePath",
        rename(serialize = "basePath"),
        skip_serializing_if = "Option::is_none"
    )]
    pub base_path: Option<PathBuf>,
}

impl AppDescriptor {
    /// Create a descriptor with both id and base path
    pub fn new(id: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Some(id.into()),
            base_path: Some(base_path.into()),
        }
    }

    /// Directory holding the application's dashboard plugins
    pub fn plugin_dir(&self) -> Option<PathBuf> {
        self.base_path
            .as_ref()
            .map(|base| base.join("lib").join("plugins").join("dash"))
    }
}

/// A user-facing notice attached to a request or returned by a plugin route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind (`notice`, `error`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Message text
    pub text: String,
}

impl Message {
    /// Create a message; an absent kind defaults to `notice`
    pub fn new(text: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            kind: kind.unwrap_or("notice").to_string(),
            text: text.into(),
        }
    }

    /// Create a `notice` message
    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }
}
