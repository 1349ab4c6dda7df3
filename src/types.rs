//! Core types shared by the registration, container and hub layers

use crate::error::Result;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Marker for values that can be triggered through the hub
///
/// Any `Clone + Send + 'static` type qualifies. Each subscriber receives
/// its own clone of the triggered value.
pub trait Event: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Event for T {}

/// Future returned by a normalised callback
pub type HandlerFuture = BoxFuture<'static, Result<()>>;

/// Cancellation-aware callback form every `register*` overload normalises to
pub type Callback<T> = Arc<dyn Fn(T, CancellationToken) -> HandlerFuture + Send + Sync>;

/// Unique identity of a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(uuid::Uuid);

impl RegistrationId {
    pub(crate) fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

/// Short, human-readable name for an event type (last path segment)
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
