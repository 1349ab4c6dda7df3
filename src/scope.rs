//! Lifetime wiring for applications
//!
//! `HubProvider` hands out `HubScope`s according to its `HubConfig`: in
//! singleton mode every scope sees the same hub, in scoped mode each scope
//! owns a fresh hub that is disposed when the scope ends.

use crate::config::{HubConfig, HubLifetime};
use crate::hub::EventHub;

/// Source of event hubs for an application
#[derive(Debug)]
pub struct HubProvider {
    config: HubConfig,
    shared: Option<EventHub>,
}

impl HubProvider {
    /// Create a provider from configuration
    pub fn new(config: HubConfig) -> Self {
        let shared = match config.lifetime {
            HubLifetime::Singleton => Some(EventHub::new()),
            HubLifetime::Scoped => None,
        };

        tracing::debug!(lifetime = %config.lifetime, "Event hub provider configured");

        Self { config, shared }
    }

    /// Configured hub lifetime
    pub fn lifetime(&self) -> HubLifetime {
        self.config.lifetime
    }

    /// The process-wide hub, if running in singleton mode
    pub fn shared(&self) -> Option<&EventHub> {
        self.shared.as_ref()
    }

    /// Open a unit-of-work scope
    pub fn scope(&self) -> HubScope {
        match &self.shared {
            Some(hub) => HubScope {
                hub: hub.clone(),
                owned: false,
            },
            None => HubScope {
                hub: EventHub::new(),
                owned: true,
            },
        }
    }

    /// Dispose the shared hub. Scoped hubs are disposed by their scopes.
    pub fn dispose(&self) {
        if let Some(hub) = &self.shared {
            hub.dispose();
        }
    }
}

impl Default for HubProvider {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// A unit of work holding the hub it should use
#[derive(Debug)]
pub struct HubScope {
    hub: EventHub,
    owned: bool,
}

impl HubScope {
    /// The hub for this scope, usable as `EventListener` and `EventTrigger`
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Whether this scope owns (and will dispose) its hub
    pub fn owns_hub(&self) -> bool {
        self.owned
    }

    /// End the scope now; an owned hub is disposed as the scope drops
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for HubScope {
    fn drop(&mut self) {
        if self.owned {
            self.hub.dispose();
        }
    }
}
