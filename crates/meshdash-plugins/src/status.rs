//! Built-in status plugin
//!
//! Serves `GET /status` with the last platform status seen.

use crate::host::PluginHost;
use crate::routes::route_fn;
use crate::traits::{DashboardPlugin, PluginRegistration};
use async_trait::async_trait;
use meshdash_core::{PlatformEvent, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Route served by [`StatusPlugin`]
pub const STATUS_ROUTE: &str = "/status";

const UNKNOWN: &str = "unknown";

/// Reports the platform status as JSON
pub struct StatusPlugin {
    last: Arc<RwLock<String>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StatusPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPlugin")
            .field("last", &*self.last.read())
            .finish()
    }
}

impl StatusPlugin {
    /// Create the plugin; status starts as `unknown`
    pub fn new() -> Self {
        Self {
            last: Arc::new(RwLock::new(UNKNOWN.to_string())),
            watcher: Mutex::new(None),
        }
    }

    /// Last status seen
    pub fn last_status(&self) -> String {
        self.last.read().clone()
    }
}

impl Default for StatusPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardPlugin for StatusPlugin {
    fn name(&self) -> &str {
        "status"
    }

    async fn connect(&self, host: &PluginHost) -> Result<PluginRegistration> {
        let mut events = host.platform.subscribe();
        let last = Arc::clone(&self.last);

        let watcher = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlatformEvent::Status(status)) => {
                        *last.write() = status.as_str().to_string();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Status plugin lagged behind platform events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Status watcher stopped");
        });

        if let Some(previous) = self.watcher.lock().replace(watcher) {
            previous.abort();
        }

        let last = Arc::clone(&self.last);
        host.routes.get(
            STATUS_ROUTE,
            route_fn(move |_ctx| {
                let status = last.read().clone();
                async move { Ok(json!({ "status": status })) }
            }),
        );

        Ok(PluginRegistration::new())
    }

    async fn disconnect(&self, host: &PluginHost) -> Result<()> {
        host.routes.remove(STATUS_ROUTE);
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        Ok(())
    }
}
