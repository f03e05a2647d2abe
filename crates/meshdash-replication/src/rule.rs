//! Replication rule documents

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Replication state of a rule that is actively running
pub const TRIGGERED: &str = "triggered";

/// A document from the `_replicator` database.
///
/// `source` and `target` are either a database name or an object with a
/// `url`; only plain names can match the local mesh database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationRule {
    /// Document id
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Replication source
    #[serde(default)]
    pub source: Value,

    /// Replication target
    #[serde(default)]
    pub target: Value,

    /// Current replication state (`triggered`, `completed`, `error`, ...)
    #[serde(rename = "_replication_state", default)]
    pub replication_state: Option<String>,
}

impl ReplicationRule {
    /// Create a rule replicating into `target`
    pub fn new(target: impl Into<String>, state: Option<&str>) -> Self {
        Self {
            id: String::new(),
            source: Value::Null,
            target: Value::String(target.into()),
            replication_state: state.map(str::to_string),
        }
    }

    /// Whether this rule replicates into the named database
    pub fn targets(&self, database: &str) -> bool {
        self.target.as_str() == Some(database)
    }

    /// Whether the replication is running
    pub fn is_triggered(&self) -> bool {
        self.replication_state.as_deref() == Some(TRIGGERED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_couch_document() {
        let rule: ReplicationRule = serde_json::from_str(
            r#"{
                "_id": "pull-mesh",
                "_rev": "3-abc",
                "source": "http://primary:5984/steelmesh",
                "target": "steelmesh",
                "continuous": true,
                "_replication_state": "triggered"
            }"#,
        )
        .unwrap();

        assert_eq!(rule.id, "pull-mesh");
        assert!(rule.targets("steelmesh"));
        assert!(rule.is_triggered());
    }

    #[test]
    fn test_object_target_never_matches() {
        let rule: ReplicationRule =
            serde_json::from_str(r#"{"target": {"url": "http://other/steelmesh"}}"#).unwrap();
        assert!(!rule.targets("steelmesh"));
        assert!(!rule.is_triggered());
    }
}
