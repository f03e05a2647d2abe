//! Plugin traits and registration types

use crate::host::PluginHost;
use async_trait::async_trait;
use meshdash_core::{NavItem, RequestContext, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Page data object produced by loaders
pub type PageData = Map<String, Value>;

/// Produces the data for one page
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Load data for `page` in the context of the current request
    async fn load(&self, ctx: &RequestContext, page: &str) -> Result<PageData>;
}

/// [`PageLoader`] backed by an async closure
pub struct FnLoader<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> std::fmt::Debug for FnLoader<F, Fut> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLoader").finish()
    }
}

#[async_trait]
impl<F, Fut> PageLoader for FnLoader<F, Fut>
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageData>> + Send,
{
    async fn load(&self, ctx: &RequestContext, page: &str) -> Result<PageData> {
        (self.f)(ctx.clone(), page.to_string()).await
    }
}

/// Wrap an async closure as a shareable loader
pub fn loader_fn<F, Fut>(f: F) -> Arc<dyn PageLoader>
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageData>> + Send + 'static,
{
    Arc::new(FnLoader {
        f,
        _fut: PhantomData,
    })
}

/// Loader that always returns the same data
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    data: PageData,
}

impl StaticLoader {
    /// Create a loader returning `data`
    pub fn new(data: PageData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl PageLoader for StaticLoader {
    async fn load(&self, _ctx: &RequestContext, _page: &str) -> Result<PageData> {
        Ok(self.data.clone())
    }
}

/// What a plugin contributes when it connects
#[derive(Clone, Default)]
pub struct PluginRegistration {
    /// Page id -> data loader
    pub loaders: HashMap<String, Arc<dyn PageLoader>>,
    /// Page id -> template id
    pub views: HashMap<String, String>,
    /// Navigation entries
    pub nav: Vec<NavItem>,
}

impl std::fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut loaders: Vec<&String> = self.loaders.keys().collect();
        loaders.sort();
        f.debug_struct("PluginRegistration")
            .field("loaders", &loaders)
            .field("views", &self.views)
            .field("nav", &self.nav)
            .finish()
    }
}

impl PluginRegistration {
    /// Create an empty registration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page loader
    pub fn with_loader(mut self, page: impl Into<String>, loader: Arc<dyn PageLoader>) -> Self {
        self.loaders.insert(page.into(), loader);
        self
    }

    /// Map a page to a template
    pub fn with_view(mut self, page: impl Into<String>, template: impl Into<String>) -> Self {
        self.views.insert(page.into(), template.into());
        self
    }

    /// Add a navigation entry
    pub fn with_nav(mut self, title: impl Into<String>, url: impl Into<String>) -> Self {
        self.nav.push(NavItem::new(title, url));
        self
    }

    /// Whether the registration contributes nothing
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty() && self.views.is_empty() && self.nav.is_empty()
    }
}

/// A dashboard plugin module.
///
/// `connect` is called once when the module is loaded and returns the
/// registration to merge into the dashboard. Routes and platform listeners
/// set up in `connect` should be torn down in `disconnect`, which runs when
/// the module is dropped from the dashboard.
#[async_trait]
pub trait DashboardPlugin: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Where the module came from, for logs
    fn module_path(&self) -> String {
        format!("builtin:{}", self.name())
    }

    /// Initialize the plugin
    async fn connect(&self, host: &PluginHost) -> Result<PluginRegistration>;

    /// Reverse whatever `connect` set up on the host
    async fn disconnect(&self, _host: &PluginHost) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_loader_fn_receives_page() {
        let loader = loader_fn(|ctx: RequestContext, page: String| async move {
            let mut data = PageData::new();
            data.insert("page".to_string(), json!(page));
            data.insert("path".to_string(), json!(ctx.path));
            Ok(data)
        });

        let data = loader
            .load(&RequestContext::new("/report"), "report")
            .await
            .unwrap();
        assert_eq!(data["page"], "report");
        assert_eq!(data["path"], "/report");
    }

    #[tokio::test]
    async fn test_static_loader() {
        let mut data = PageData::new();
        data.insert("heading".to_string(), json!("Reports"));

        let loader = StaticLoader::new(data);
        let loaded = loader.load(&RequestContext::default(), "x").await.unwrap();
        assert_eq!(loaded["heading"], "Reports");
    }

    #[test]
    fn test_registration_builder() {
        let registration = PluginRegistration::new()
            .with_view("dashboard", "dash/main")
            .with_nav("Dashboard", "/dashboard")
            .with_loader("dashboard", Arc::new(StaticLoader::default()));

        assert!(!registration.is_empty());
        assert_eq!(registration.views["dashboard"], "dash/main");
        assert_eq!(registration.nav.len(), 1);
        assert!(format!("{registration:?}").contains("dashboard"));
    }
}
