//! Page rendering
//!
//! Resolves a request path to a page id, gathers the page data, picks a view
//! and hands both to the render capability. Pages with no view yield
//! [`PageOutcome::Next`] so the HTTP layer can fall through to its
//! not-found handler.

use crate::data::PageDataSource;
use crate::engine::{View, ViewEngine};
use crate::views::TemplateLocator;
use meshdash_core::{DashboardHandle, Error, RequestContext, Result};
use meshdash_plugins::{PageData, PluginRegistry};
use serde_json::{json, Value};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, warn};

/// Page id used for the root path
pub const INDEX_PAGE: &str = "index";

/// Result of a render attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was rendered to HTML
    Rendered(String),
    /// Nothing renders this page; continue with the next handler
    Next,
}

/// Renders dashboard pages
#[derive(Clone)]
pub struct PageRenderer {
    dashboard: DashboardHandle,
    registry: PluginRegistry,
    data_source: Arc<dyn PageDataSource>,
    locator: Arc<dyn TemplateLocator>,
    engine: Arc<dyn ViewEngine>,
}

impl std::fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRenderer")
            .field("dashboard", &self.dashboard)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PageRenderer {
    /// Create a renderer
    pub fn new(
        dashboard: DashboardHandle,
        registry: PluginRegistry,
        data_source: Arc<dyn PageDataSource>,
        locator: Arc<dyn TemplateLocator>,
        engine: Arc<dyn ViewEngine>,
    ) -> Self {
        Self {
            dashboard,
            registry,
            data_source,
            locator,
            engine,
        }
    }

    /// Registry consulted for loaders, views and nav
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Strip one leading `/`; the empty path is the index page. Ids that
    /// could escape the views or page-data roots are rejected.
    pub fn normalize(path: &str) -> Result<String> {
        let page = path.strip_prefix('/').unwrap_or(path);

        let escapes = Path::new(page)
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if page.contains('\\') || escapes {
            return Err(Error::InvalidPage(path.to_string()));
        }

        if page.is_empty() {
            Ok(INDEX_PAGE.to_string())
        } else {
            Ok(page.to_string())
        }
    }

    /// `dash`, `title`, `apps` and `nav`
    pub fn default_data(&self) -> PageData {
        let mut data = PageData::new();
        data.insert("dash".to_string(), self.dashboard.to_json());
        data.insert("title".to_string(), json!(self.dashboard.title()));
        data.insert(
            "apps".to_string(),
            serde_json::to_value(self.dashboard.apps()).unwrap_or_default(),
        );
        data.insert(
            "nav".to_string(),
            serde_json::to_value(self.registry.snapshot_nav()).unwrap_or_default(),
        );
        data
    }

    /// Page data merged over the defaults and the dashboard state, later
    /// sources winning. Request fields are not included.
    pub async fn resolve_page_data(&self, ctx: &RequestContext, page: &str) -> PageData {
        let mut data = self.default_data();

        if let Ok(Value::Object(state)) = serde_json::to_value(self.dashboard.state()) {
            data.extend(state);
        }

        data.extend(self.load_page_data(ctx, page).await);
        data
    }

    async fn load_page_data(&self, ctx: &RequestContext, page: &str) -> PageData {
        if let Some(loader) = self.registry.lookup_loader(page) {
            return match loader.load(ctx, page).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(page = %page, error = %e, "Page loader failed");
                    PageData::new()
                }
            };
        }

        match self.data_source.load(page).await {
            Ok(Some(data)) => data,
            Ok(None) => PageData::new(),
            Err(e) => {
                warn!(page = %page, error = %e, "Page data could not be read");
                PageData::new()
            }
        }
    }

    /// The plugin view for `page`, else the template on disk
    pub async fn resolve_view(&self, page: &str) -> Option<View> {
        if let Some(template) = self.registry.lookup_view(page) {
            return Some(View::Template(template));
        }

        self.locator.locate(page).await.map(View::File)
    }

    /// Render the page for `path`
    pub async fn render(&self, path: &str, ctx: &RequestContext) -> Result<PageOutcome> {
        let page = match Self::normalize(path) {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Rejected page path");
                return Ok(PageOutcome::Next);
            }
        };

        let mut data = self.resolve_page_data(ctx, &page).await;

        let Some(view) = self.resolve_view(&page).await else {
            debug!(page = %page, "No view for page");
            return Ok(PageOutcome::Next);
        };

        data.insert("page".to_string(), json!(page));
        data.insert("messages".to_string(), serde_json::to_value(&ctx.messages)?);

        let html = self
            .engine
            .render(&page, &view, &data)
            .await
            .map_err(|e| match e {
                Error::Render(_) => e,
                other => Error::Render(other.to_string()),
            })?;

        Ok(PageOutcome::Rendered(html))
    }
}
