//! Primary/secondary mode detection
//!
//! A node is secondary when an active (`triggered`) replication writes into
//! its mesh database. Anything else, including failing to read the
//! replication rules at all, leaves the node primary.

use crate::rule::ReplicationRule;
use crate::source::ReplicationSource;
use meshdash_core::{DashboardHandle, Error, Mode};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one detection run
#[derive(Debug)]
pub struct Detection {
    /// Computed mode
    pub mode: Mode,
    /// Fetch error, if the rules could not be read
    pub error: Option<Error>,
}

/// Computes the replication mode and stores it on the dashboard
#[derive(Clone)]
pub struct ModeDetector {
    source: Arc<dyn ReplicationSource>,
    dashboard: DashboardHandle,
}

impl std::fmt::Debug for ModeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeDetector")
            .field("source", &"<dyn ReplicationSource>")
            .finish()
    }
}

impl ModeDetector {
    /// Create a detector reading rules from `source`
    pub fn new(source: Arc<dyn ReplicationSource>, dashboard: DashboardHandle) -> Self {
        Self { source, dashboard }
    }

    /// Fetch the rules at `database_url` and compute the mode for `mesh_db`
    pub async fn detect(&self, database_url: &str, mesh_db: &str) -> Detection {
        let (rules, error) = match self.source.fetch_rules(database_url).await {
            Ok(rules) => (rules, None),
            Err(e) => {
                warn!(
                    url = %redact(database_url),
                    error = %e,
                    "Failed to get replication information, assuming primary"
                );
                (Vec::new(), Some(e))
            }
        };

        let mode = evaluate(&rules, mesh_db);
        self.dashboard.set_mode(mode);

        info!(mode = %mode, meshdb = %mesh_db, "Dashboard mode detected");

        Detection { mode, error }
    }
}

/// Secondary iff any rule targeting `mesh_db` is triggered.
///
/// Every rule is inspected; a later non-triggered match never resets an
/// earlier triggered one.
pub fn evaluate(rules: &[ReplicationRule], mesh_db: &str) -> Mode {
    let mut secondary = false;

    for rule in rules.iter().filter(|rule| rule.targets(mesh_db)) {
        info!(rule = %rule.id, meshdb = %mesh_db, "Detected replication rule targeting meshdb");

        if rule.is_triggered() {
            secondary = true;
        }
    }

    if secondary {
        Mode::Secondary
    } else {
        Mode::Primary
    }
}

fn redact(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => database_url.to_string(),
    }
}
