//! Registration bus
//!
//! Plugins and the loader never touch the registry directly; they send
//! [`RegistryCommand`]s, which a single relay task applies in arrival order.

use crate::registry::{PluginRegistry, RegistryCommand};
use meshdash_core::{Error, Result};
use tokio::sync::mpsc;

/// Sending half of the registration bus
#[derive(Debug, Clone)]
pub struct RegistryBus {
    sender: mpsc::UnboundedSender<RegistryCommand>,
}

impl RegistryBus {
    /// Create a bus and its receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RegistryCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Send a command to the registry
    pub fn send(&self, command: RegistryCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| Error::Runtime("registration bus closed".to_string()))
    }

    /// Ask the registry to remove nav entries with `url`
    pub fn remove_nav(&self, url: impl Into<String>) -> Result<()> {
        self.send(RegistryCommand::RemoveNav {
            url: Some(url.into()),
        })
    }

    /// Ask the registry to drop the loader for `page`
    pub fn drop_loader(&self, page: impl Into<String>) -> Result<()> {
        self.send(RegistryCommand::DropLoader { key: page.into() })
    }

    /// Ask the registry to drop the view for `page`
    pub fn drop_view(&self, page: impl Into<String>) -> Result<()> {
        self.send(RegistryCommand::DropView { key: page.into() })
    }
}

/// Apply every command from `receiver` until all senders are gone
pub async fn relay(mut receiver: mpsc::UnboundedReceiver<RegistryCommand>, registry: PluginRegistry) {
    while let Some(command) = receiver.recv().await {
        registry.apply(command);
    }

    tracing::debug!("Registration bus closed");
}

/// Apply whatever is queued right now without waiting
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<RegistryCommand>, registry: &PluginRegistry) -> usize {
    let mut applied = 0;
    while let Ok(command) = receiver.try_recv() {
        registry.apply(command);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PluginRegistration;

    #[tokio::test]
    async fn test_relay_applies_in_order() {
        let (bus, rx) = RegistryBus::channel();
        let registry = PluginRegistry::new();

        bus.send(RegistryCommand::RegisterPlugin {
            name: "nav".to_string(),
            registration: PluginRegistration::new()
                .with_nav("A", "/a")
                .with_view("a", "nav/a"),
            module_path: None,
        })
        .unwrap();
        bus.remove_nav("/a").unwrap();
        bus.drop_view("a").unwrap();
        drop(bus);

        relay(rx, registry.clone()).await;

        assert!(registry.snapshot_nav().is_empty());
        assert!(registry.lookup_view("a").is_none());
    }

    #[test]
    fn test_drain() {
        let (bus, mut rx) = RegistryBus::channel();
        let registry = PluginRegistry::new();

        bus.drop_loader("missing").unwrap();
        bus.remove_nav("/missing").unwrap();

        assert_eq!(drain(&mut rx, &registry), 2);
        assert_eq!(drain(&mut rx, &registry), 0);
    }

    #[test]
    fn test_send_after_close() {
        let (bus, rx) = RegistryBus::channel();
        drop(rx);
        assert!(bus.drop_view("x").is_err());
    }
}
