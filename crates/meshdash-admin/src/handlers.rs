//! HTTP handlers for the admin dashboard

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use meshdash_core::{DashboardHandle, Error, RequestContext};
use meshdash_plugins::{message_body, RouteTable};
use serde_json::json;
use std::collections::HashMap;
use tracing::error;

use crate::renderer::{PageOutcome, PageRenderer};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Page renderer
    pub renderer: PageRenderer,
    /// Plugin routes, consulted before page rendering
    pub routes: RouteTable,
    /// Dashboard lifecycle state
    pub dashboard: DashboardHandle,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(renderer: PageRenderer, routes: RouteTable, dashboard: DashboardHandle) -> Self {
        Self {
            renderer,
            routes,
            dashboard,
        }
    }
}

/// Helper struct for rendering Askama templates
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {err}"),
            )
                .into_response(),
        }
    }
}

/// Not-found page template
#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    /// Dashboard title
    pub title: String,
    /// Requested path
    pub path: String,
}

/// Answer a plugin route with `{"messages": [{"type", "text"}]}`
pub fn messages_response(text: impl Into<String>, kind: Option<&str>) -> Response {
    Json(message_body(text, kind)).into_response()
}

fn error_response(err: &Error) -> Response {
    (
        err.to_status_code(),
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// Not-found handler; the last step of the dispatch chain
pub fn not_found(state: &AppState, path: &str) -> Response {
    let template = NotFoundTemplate {
        title: state.dashboard.title().to_string(),
        path: path.to_string(),
    };

    (StatusCode::NOT_FOUND, HtmlTemplate(template)).into_response()
}

/// Dispatch a request: plugin route, then page render, then not-found
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path = uri.path();
    let mut ctx = RequestContext::new(path);
    ctx.query = query;

    if let Some(handler) = state.routes.lookup(path) {
        return match handler.handle(&ctx).await {
            Ok(body) => Json(body).into_response(),
            Err(e) => {
                error!(path = %path, error = %e, "Plugin route failed");
                error_response(&e)
            }
        };
    }

    match state.renderer.render(path, &ctx).await {
        Ok(PageOutcome::Rendered(html)) => Html(html).into_response(),
        Ok(PageOutcome::Next) => not_found(&state, path),
        Err(e) => {
            error!(path = %path, error = %e, "Page render failed");
            error_response(&e)
        }
    }
}
