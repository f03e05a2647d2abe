//! Plugin route table
//!
//! The server capability handed to plugins. Plugins add JSON `GET` routes at
//! connect time and remove them when dropped; the HTTP layer consults the
//! table before falling back to page rendering.

use async_trait::async_trait;
use dashmap::DashMap;
use meshdash_core::{Message, RequestContext, Result};
use serde_json::{json, Value};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Handles one plugin route
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Produce the JSON response body
    async fn handle(&self, ctx: &RequestContext) -> Result<Value>;
}

struct FnRoute<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> RouteHandler for FnRoute<F, Fut>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, ctx: &RequestContext) -> Result<Value> {
        (self.f)(ctx.clone()).await
    }
}

/// Wrap an async closure as a route handler
pub fn route_fn<F, Fut>(f: F) -> Arc<dyn RouteHandler>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnRoute {
        f,
        _fut: PhantomData,
    })
}

/// Body of a message response: `{"messages": [{"type", "text"}]}`
pub fn message_body(text: impl Into<String>, kind: Option<&str>) -> Value {
    json!({ "messages": [Message::new(text, kind)] })
}

/// Routes registered by plugins, keyed by exact path
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Arc<DashMap<String, Arc<dyn RouteHandler>>>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("paths", &self.paths())
            .finish()
    }
}

impl RouteTable {
    /// Create an empty route table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `GET` route; returns `true` if it replaced an existing one
    pub fn get(&self, path: impl Into<String>, handler: Arc<dyn RouteHandler>) -> bool {
        let path = path.into();
        let replaced = self.routes.insert(path.clone(), handler).is_some();
        if replaced {
            tracing::warn!(path = %path, "Plugin route replaced");
        } else {
            tracing::debug!(path = %path, "Plugin route added");
        }
        replaced
    }

    /// Remove a route; returns `true` if it existed
    pub fn remove(&self, path: &str) -> bool {
        self.routes.remove(path).is_some()
    }

    /// Handler registered for `path`
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn RouteHandler>> {
        self.routes.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}
