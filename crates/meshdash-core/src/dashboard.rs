//! Shared dashboard state
//!
//! One [`DashboardHandle`] exists per dashboard instance. It is cloned into
//! every component that needs to read or update lifecycle state, the
//! replication mode or the set of loaded applications. Locks are never held
//! across an `.await`.

use crate::types::{AppDescriptor, DashboardState, Mode, Status};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default page title
pub const DEFAULT_TITLE: &str = "Steelmesh Admin Dashboard";

#[derive(Debug)]
struct Inner {
    title: String,
    state: RwLock<DashboardState>,
    mode: RwLock<Mode>,
    apps: RwLock<BTreeMap<String, AppDescriptor>>,
}

/// Cloneable handle to one dashboard's lifecycle state
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    inner: Arc<Inner>,
}

impl DashboardHandle {
    /// Create a handle with the given page title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                title: title.into(),
                state: RwLock::new(DashboardState::default()),
                mode: RwLock::new(Mode::default()),
                apps: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Page title used in default page data
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Snapshot of the lifecycle state
    pub fn state(&self) -> DashboardState {
        self.inner.state.read().clone()
    }

    /// Record a platform status change
    pub fn apply_status(&self, status: Status) {
        tracing::debug!(status = %status, "Dashboard status changed");
        self.inner.state.write().apply_status(status);
    }

    /// Mark whether the HTTP listener is bound
    pub fn set_server_up(&self, up: bool) {
        self.inner.state.write().serverup = up;
    }

    /// Current replication mode
    pub fn mode(&self) -> Mode {
        *self.inner.mode.read()
    }

    /// Store the replication mode computed by the detector
    pub fn set_mode(&self, mode: Mode) {
        *self.inner.mode.write() = mode;
    }

    /// Remember a loaded application. Descriptors without an id are not
    /// tracked but may still carry a plugin directory.
    pub fn register_app(&self, app: &AppDescriptor) {
        if let Some(id) = &app.id {
            self.inner.apps.write().insert(id.clone(), app.clone());
        }
    }

    /// Loaded applications keyed by id
    pub fn apps(&self) -> BTreeMap<String, AppDescriptor> {
        self.inner.apps.read().clone()
    }

    /// JSON view of the handle exposed to templates as `dash`
    pub fn to_json(&self) -> Value {
        let apps: Vec<String> = self.inner.apps.read().keys().cloned().collect();
        json!({
            "title": self.title(),
            "mode": self.mode(),
            "apps": apps,
        })
    }
}

impl Default for DashboardHandle {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let dash = DashboardHandle::default();
        let other = dash.clone();

        other.apply_status(Status::Online);
        other.set_mode(Mode::Secondary);

        assert!(dash.state().online);
        assert_eq!(dash.mode(), Mode::Secondary);
    }

    #[test]
    fn test_register_app_requires_id() {
        let dash = DashboardHandle::default();

        dash.register_app(&AppDescriptor::new("geo", "/srv/geo"));
        dash.register_app(&AppDescriptor {
            id: None,
            base_path: Some("/srv/anon".into()),
        });

        let apps = dash.apps();
        assert_eq!(apps.len(), 1);
        assert!(apps.contains_key("geo"));
    }

    #[test]
    fn test_to_json() {
        let dash = DashboardHandle::new("Test");
        dash.register_app(&AppDescriptor::new("geo", "/srv/geo"));

        let value = dash.to_json();
        assert_eq!(value["title"], "Test");
        assert_eq!(value["mode"], "primary");
        assert_eq!(value["apps"][0], "geo");
    }
}
