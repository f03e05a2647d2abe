//! # meshdash Core
//!
//! Core types, shared state, and error handling for the meshdash admin dashboard.
//!
//! This crate provides the foundational abstractions used throughout the dashboard:
//! - Lifecycle state, nav items and replication mode
//! - The per-instance [`DashboardHandle`]
//! - The platform event bus
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod dashboard;
pub mod error;
pub mod platform;
pub mod request;
pub mod types;

pub use dashboard::{DashboardHandle, DEFAULT_TITLE};
pub use error::{Error, Result};
pub use platform::{Platform, PlatformEvent};
pub use request::RequestContext;
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dashboard::DashboardHandle;
    pub use crate::error::{Error, Result};
    pub use crate::platform::{Platform, PlatformEvent};
    pub use crate::request::RequestContext;
    pub use crate::types::*;
}
