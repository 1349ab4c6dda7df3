//! # a3s-signal
//!
//! Typed in-process event hub for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-signal` lets unrelated components react to the same event without
//! knowing about each other: callers register typed callbacks for an event
//! type, other callers trigger values of that type, and every callback that
//! is live at trigger time runs concurrently.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_signal::EventHub;
//!
//! #[derive(Clone, Debug)]
//! struct Ping {
//!     id: u32,
//! }
//!
//! # async fn example() -> a3s_signal::Result<()> {
//! let hub = EventHub::new();
//!
//! let registration = hub.register(|ping: Ping| {
//!     println!("ping {}", ping.id);
//! })?;
//!
//! hub.trigger(Ping { id: 1 }).await?;
//!
//! // Unregister; the `Ping` container goes away with its last callback
//! registration.dispose();
//! hub.trigger(Ping { id: 2 }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Registration** — RAII handle for one callback; disposal is one-shot
//! - **RegistrationContainer** — live callbacks for one event type, disposes
//!   itself when its last registration goes
//! - **EventHub** — maps event types to containers; implements the
//!   `EventListener` and `EventTrigger` capabilities
//! - **HubProvider** — singleton or per-scope hubs, chosen by `HubConfig`

pub mod config;
pub mod container;
pub mod error;
pub mod hub;
pub mod registration;
pub mod scope;
pub mod set;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export core types
pub use config::{HubConfig, HubLifetime};
pub use container::RegistrationContainer;
pub use error::{Result, SignalError};
pub use hub::{EventHub, EventListener, EventTrigger};
pub use registration::Registration;
pub use scope::{HubProvider, HubScope};
pub use set::RegistrationSet;
pub use types::{Callback, Event, HandlerFuture, RegistrationId};

// Callers supply cancellation tokens of this type
pub use tokio_util::sync::CancellationToken;
