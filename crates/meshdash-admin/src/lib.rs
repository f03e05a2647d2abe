#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Page renderer and HTTP surface for the meshdash admin dashboard
//!
//! Pages are resolved through plugin views or templates on disk, filled with
//! page data from plugin loaders or JSON files, and rendered inside an
//! Askama layout. Plugin routes take precedence over page rendering.

pub mod data;
pub mod engine;
pub mod handlers;
pub mod renderer;
pub mod router;
pub mod views;

pub use data::{JsonFileDataSource, PageDataSource};
pub use engine::{LayoutEngine, View, ViewEngine};
pub use handlers::{dispatch, messages_response, not_found, AppState, HtmlTemplate};
pub use renderer::{PageOutcome, PageRenderer, INDEX_PAGE};
pub use router::{DashboardRouter, STATIC_PREFIX};
pub use views::{DiskTemplateLocator, TemplateLocator};

/// Custom Askama filters
pub mod filters {
    use serde::Serialize;

    /// Serialize a value to JSON for embedding in a `<script>` element
    pub fn json_script<T: Serialize>(value: &T) -> askama::Result<String> {
        serde_json::to_string(value)
            .map(|json| json.replace("</", "<\\/"))
            .map_err(|e| askama::Error::Custom(Box::new(e)))
    }

}
