//! Static page data
//!
//! Pages without a registered loader may ship a JSON file named after the
//! page in the page-data directory.

use async_trait::async_trait;
use meshdash_core::{Error, Result};
use meshdash_plugins::PageData;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Source of page data for pages without a loader
#[async_trait]
pub trait PageDataSource: Send + Sync {
    /// Data for `page`, or `None` when the page has none
    async fn load(&self, page: &str) -> Result<Option<PageData>>;
}

/// Reads `<root>/<page>.json`
#[derive(Debug, Clone)]
pub struct JsonFileDataSource {
    root: PathBuf,
}

impl JsonFileDataSource {
    /// Create a source reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are read from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl PageDataSource for JsonFileDataSource {
    async fn load(&self, page: &str) -> Result<Option<PageData>> {
        let path = self.root.join(format!("{page}.json"));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(data) => Ok(Some(data)),
            _ => Err(Error::Render(format!(
                "page data in {} is not a JSON object",
                path.display()
            ))),
        }
    }
}
