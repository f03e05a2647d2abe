//! Dashboard router
//!
//! Static assets live under `/static`; every other request goes through
//! [`dispatch`](crate::handlers::dispatch).

use axum::http::{header, HeaderValue};
use axum::Router;
use meshdash_core::{Error, Result};
use std::path::Path;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{dispatch, AppState};

/// Mount point for static assets
pub const STATIC_PREFIX: &str = "/static";

/// Builds the dashboard's axum router
#[derive(Debug, Clone, Copy)]
pub struct DashboardRouter;

impl DashboardRouter {
    /// Build the router serving `static_dir` with `max_age` cache headers
    pub fn build(state: AppState, static_dir: impl AsRef<Path>, max_age: Duration) -> Result<Router> {
        let cache_control = HeaderValue::try_from(format!("public, max-age={}", max_age.as_secs()))
            .map_err(|e| Error::Config(format!("Invalid cache-control header: {e}")))?;

        let static_files = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                cache_control,
            ))
            .service(ServeDir::new(static_dir.as_ref()));

        Ok(Router::new()
            .nest_service(STATIC_PREFIX, static_files)
            .fallback(dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JsonFileDataSource;
    use crate::engine::LayoutEngine;
    use crate::handlers::messages_response;
    use crate::renderer::PageRenderer;
    use crate::views::DiskTemplateLocator;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use meshdash_core::DashboardHandle;
    use meshdash_plugins::{route_fn, PluginRegistry, RouteTable};
    use serde_json::{json, Value};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Site {
        _dir: TempDir,
        router: Router,
        routes: RouteTable,
    }

    fn site() -> Site {
        let dir = TempDir::new().unwrap();
        let views = dir.path().join("views");
        let pagedata = dir.path().join("pagedata");
        let assets = dir.path().join("_static");
        fs::create_dir_all(&views).unwrap();
        fs::create_dir_all(&pagedata).unwrap();
        fs::create_dir_all(&assets).unwrap();

        fs::write(views.join("index.tmpl"), "<h2>Welcome {{ greeting }}</h2>").unwrap();
        fs::write(pagedata.join("index.json"), r#"{"greeting": "operator"}"#).unwrap();
        fs::write(assets.join("app.css"), "body { color: black; }").unwrap();

        let dashboard = DashboardHandle::new("Mesh");
        let routes = RouteTable::new();
        let renderer = PageRenderer::new(
            dashboard.clone(),
            PluginRegistry::new(),
            Arc::new(JsonFileDataSource::new(&pagedata)),
            Arc::new(DiskTemplateLocator::new(&views, "tmpl")),
            Arc::new(LayoutEngine::new(&views, "tmpl").unwrap()),
        );

        let state = AppState::new(renderer, routes.clone(), dashboard);
        let router = DashboardRouter::build(state, &assets, Duration::from_secs(60)).unwrap();

        Site {
            _dir: dir,
            router,
            routes,
        }
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_renders_index() {
        let site = site();
        let (status, _, body) = get(&site.router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h2>Welcome operator</h2>"));
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let site = site();
        let (status, _, body) = get(&site.router, "/nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Page not found"));
    }

    #[tokio::test]
    async fn test_absolute_page_cannot_leave_roots() {
        let site = site();
        let outside = site._dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.tmpl"), "SECRET {{ pw }}").unwrap();
        fs::write(outside.join("secret.json"), r#"{"pw": "hunter2"}"#).unwrap();

        let uri = format!("/{}", outside.join("secret").display());
        let (status, _, body) = get(&site.router, &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("SECRET"));
        assert!(!body.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_plugin_route_wins_over_page() {
        let site = site();
        site.routes.get(
            "/index",
            route_fn(|_ctx| async { Ok(json!({ "from": "plugin" })) }),
        );

        let (status, _, body) = get(&site.router, "/index").await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["from"], "plugin");
    }

    #[tokio::test]
    async fn test_plugin_route_receives_query() {
        let site = site();
        site.routes.get(
            "/echo",
            route_fn(|ctx| async move { Ok(json!({ "q": ctx.param("q") })) }),
        );

        let (_, _, body) = get(&site.router, "/echo?q=mesh").await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["q"], "mesh");
    }

    #[tokio::test]
    async fn test_static_assets_have_cache_control() {
        let site = site();
        let (status, headers, body) = get(&site.router, "/static/app.css").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
        assert!(body.contains("color: black"));
    }

    #[tokio::test]
    async fn test_post_not_allowed() {
        let site = site();
        let response = site
            .router
            .clone()
            .oneshot(Request::post("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_messages_response() {
        let response = messages_response("Saved", None);
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["messages"][0]["type"], "notice");
    }
}
