//! On-disk template lookup

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Extension tried after the rich template extension
pub const HTML_EXTENSION: &str = "html";

/// Finds the template file for a page
#[async_trait]
pub trait TemplateLocator: Send + Sync {
    /// Path of the template for `page`, if one exists
    async fn locate(&self, page: &str) -> Option<PathBuf>;
}

/// Looks for `<root>/<page>.<ext>` and then `<root>/<page>.html`
#[derive(Debug, Clone)]
pub struct DiskTemplateLocator {
    root: PathBuf,
    extension: String,
}

impl DiskTemplateLocator {
    /// Create a locator for `root` with the rich template `extension`
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Views directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths in lookup order
    pub fn candidates(&self, page: &str) -> Vec<PathBuf> {
        vec![
            self.root.join(format!("{page}.{}", self.extension)),
            self.root.join(format!("{page}.{HTML_EXTENSION}")),
        ]
    }
}

#[async_trait]
impl TemplateLocator for DiskTemplateLocator {
    async fn locate(&self, page: &str) -> Option<PathBuf> {
        for candidate in self.candidates(page) {
            if let Ok(meta) = tokio::fs::metadata(&candidate).await {
                if meta.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}
