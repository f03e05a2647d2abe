//! # meshdash Replication
//!
//! Decides whether the local node is a replication primary or secondary by
//! reading the CouchDB `_replicator` database.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod detector;
pub mod rule;
pub mod source;

pub use detector::{evaluate, Detection, ModeDetector};
pub use rule::ReplicationRule;
pub use source::{CouchReplicationSource, ReplicationSource, StaticReplicationSource};
