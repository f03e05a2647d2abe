//! Platform lifecycle event bus
//!
//! The hosting platform announces status changes and application loads.
//! Every subscriber gets its own receiver; a slow subscriber that lags
//! behind only loses its own backlog.

use crate::types::{AppDescriptor, Status};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Events emitted by the hosting platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// `status` - the platform changed lifecycle status
    Status(Status),
    /// `app.load` - an application finished loading
    AppLoad(AppDescriptor),
}

/// Handle to the platform event bus
#[derive(Debug, Clone)]
pub struct Platform {
    sender: broadcast::Sender<PlatformEvent>,
}

impl Platform {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to platform events
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of subscribers that received it
    pub fn emit(&self, event: PlatformEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::debug!("Platform event dropped, no subscribers");
                0
            }
        }
    }

    /// Publish a status change
    pub fn emit_status(&self, status: impl Into<Status>) -> usize {
        self.emit(PlatformEvent::Status(status.into()))
    }

    /// Publish an application load
    pub fn emit_app_load(&self, app: AppDescriptor) -> usize {
        self.emit(PlatformEvent::AppLoad(app))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let platform = Platform::new();
        let mut rx = platform.subscribe();

        assert_eq!(platform.emit_status("online"), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, PlatformEvent::Status(Status::Online));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let platform = Platform::new();
        assert_eq!(platform.emit_app_load(AppDescriptor::default()), 0);
    }
}
