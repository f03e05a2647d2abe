//! Render capability
//!
//! A [`ViewEngine`] turns a view and the merged page data into HTML. The
//! default [`LayoutEngine`] reads the view file, substitutes `{{ key }}`
//! placeholders from the page data and wraps the result in the dashboard
//! layout.

use crate::filters;
use crate::views::HTML_EXTENSION;
use askama::Template;
use async_trait::async_trait;
use meshdash_core::{Error, Message, NavItem, Result, DEFAULT_TITLE};
use meshdash_plugins::PageData;
use regex::{Captures, Regex};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// What to render for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Template id registered by a plugin
    Template(String),
    /// Template file found on disk
    File(PathBuf),
}

/// Renders a view with page data
#[async_trait]
pub trait ViewEngine: Send + Sync {
    /// Produce the HTML for `page`
    async fn render(&self, page: &str, view: &View, data: &PageData) -> Result<String>;
}

/// Dashboard layout
#[derive(Template)]
#[template(path = "layout.html")]
pub struct LayoutTemplate {
    /// Dashboard title
    pub title: String,
    /// Normalized page id
    pub page: String,
    /// Navigation entries
    pub nav: Vec<NavItem>,
    /// Platform status
    pub status: String,
    /// Replication mode
    pub mode: String,
    /// Request messages
    pub messages: Vec<Message>,
    /// Rendered view
    pub body: String,
    /// Page data exposed to scripts
    pub data: Value,
}

/// Default [`ViewEngine`]
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    views_root: PathBuf,
    extension: String,
    placeholder: Regex,
}

impl LayoutEngine {
    /// Create an engine resolving template ids under `views_root`
    pub fn new(views_root: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}")
            .map_err(|e| Error::Render(format!("Invalid placeholder pattern: {e}")))?;

        Ok(Self {
            views_root: views_root.into(),
            extension: extension.into(),
            placeholder,
        })
    }

    async fn read_view(&self, view: &View) -> Result<String> {
        let candidates = match view {
            View::File(path) => vec![path.clone()],
            View::Template(id) if Path::new(id).is_absolute() => vec![PathBuf::from(id)],
            View::Template(id) => vec![
                self.views_root.join(format!("{id}.{}", self.extension)),
                self.views_root.join(format!("{id}.{HTML_EXTENSION}")),
                self.views_root.join(id),
            ],
        };

        for candidate in &candidates {
            if let Ok(source) = tokio::fs::read_to_string(candidate).await {
                return Ok(source);
            }
        }

        Err(Error::Template(format!("view {view:?} could not be read")))
    }

    /// Substitute `{{ key }}` and `{{ a.b }}` placeholders, HTML-escaped
    pub fn interpolate(&self, source: &str, data: &PageData) -> String {
        self.placeholder
            .replace_all(source, |caps: &Captures<'_>| {
                lookup(data, &caps[1]).map(display_value).unwrap_or_default()
            })
            .into_owned()
    }
}

#[async_trait]
impl ViewEngine for LayoutEngine {
    async fn render(&self, page: &str, view: &View, data: &PageData) -> Result<String> {
        let source = self.read_view(view).await?;
        let body = self.interpolate(&source, data);

        let layout = LayoutTemplate {
            title: data
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            page: page.to_string(),
            nav: decode(data.get("nav")),
            status: text(lookup(data, "status")),
            mode: text(lookup(data, "dash.mode")),
            messages: decode(data.get("messages")),
            body,
            data: Value::Object(data.clone()),
        };

        layout
            .render()
            .map_err(|e| Error::Render(format!("Failed to render layout: {e}")))
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn lookup<'a>(data: &'a PageData, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape_html(s),
        other => escape_html(&other.to_string()),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn data(value: Value) -> PageData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_interpolate() {
        let engine = LayoutEngine::new("views", "tmpl").unwrap();
        let page = data(json!({
            "heading": "<Reports>",
            "count": 3,
            "dash": { "mode": "secondary" },
            "nav": [ { "title": "A", "url": "/a" } ]
        }));

        let out = engine.interpolate(
            "{{heading}} {{ count }} {{dash.mode}} {{nav.0.url}} [{{missing}}]",
            &page,
        );
        assert_eq!(out, "&lt;Reports&gt; 3 secondary /a []");
    }

    #[tokio::test]
    async fn test_render_template_id_in_layout() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dash")).unwrap();
        fs::write(dir.path().join("dash/main.tmpl"), "<p>{{ heading }}</p>").unwrap();

        let engine = LayoutEngine::new(dir.path(), "tmpl").unwrap();
        let page = data(json!({
            "title": "Mesh",
            "heading": "Hello",
            "status": "online",
            "nav": [ { "title": "Dashboard", "url": "/dashboard" } ],
            "messages": [ { "type": "notice", "text": "Saved" } ],
            "dash": { "mode": "primary" }
        }));

        let html = engine
            .render("dashboard", &View::Template("dash/main".to_string()), &page)
            .await
            .unwrap();

        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("<title>Mesh - dashboard</title>"));
        assert!(html.contains("Dashboard</a>"));
        assert!(html.contains("Saved"));
        assert!(html.contains("status-online"));
    }

    #[tokio::test]
    async fn test_page_data_cannot_close_script() {
        let dir = TempDir::new().unwrap();
        let view = dir.path().join("index.html");
        fs::write(&view, "ok").unwrap();

        let engine = LayoutEngine::new(dir.path(), "tmpl").unwrap();
        let page = data(json!({ "evil": "</script><script>alert(1)</script>" }));

        let html = engine.render("index", &View::File(view), &page).await.unwrap();
        assert!(!html.contains("</script><script>alert"));
        assert!(html.contains(r"<\/script>"));
    }

    #[tokio::test]
    async fn test_missing_view_is_template_error() {
        let dir = TempDir::new().unwrap();
        let engine = LayoutEngine::new(dir.path(), "tmpl").unwrap();

        let err = engine
            .render("x", &View::Template("nowhere/x".to_string()), &PageData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
