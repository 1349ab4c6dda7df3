//! Event hub — maps event types to registration containers
//!
//! `EventHub` lazily creates one `RegistrationContainer` per event type,
//! forwards `register`/`trigger` to it, and drops containers once they
//! dispose themselves. Disposing the hub disposes every remaining container
//! exactly once.

use crate::container::{ErasedContainer, RegistrationContainer};
use crate::error::{Result, SignalError};
use crate::registration::Registration;
use crate::types::{short_type_name, Callback, Event};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{self, FutureExt};
use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// Listener side of the hub
///
/// The three overloads all normalise to the cancellation-aware form.
pub trait EventListener: Send + Sync {
    /// Register a synchronous callback
    fn register<T, F>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) + Send + Sync + 'static;

    /// Register an async callback
    fn register_async<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static;

    /// Register an async callback that receives the trigger's cancellation token
    fn register_with_cancel<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static;
}

/// Trigger side of the hub
#[async_trait]
pub trait EventTrigger: Send + Sync {
    /// Trigger an event with a token that is never cancelled
    async fn trigger<T: Event>(&self, event: T) -> Result<()> {
        self.trigger_with_cancel(event, CancellationToken::new())
            .await
    }

    /// Trigger an event, passing `cancel` through to every callback
    async fn trigger_with_cancel<T: Event>(
        &self,
        event: T,
        cancel: CancellationToken,
    ) -> Result<()>;
}

struct HubInner {
    containers: DashMap<TypeId, Box<dyn ErasedContainer>>,
    disposed: AtomicBool,
}

impl HubInner {
    fn lookup<T: Event>(&self) -> Option<RegistrationContainer<T>> {
        self.containers
            .get(&TypeId::of::<T>())
            .and_then(|slot| {
                slot.as_any()
                    .downcast_ref::<RegistrationContainer<T>>()
                    .cloned()
            })
    }

    /// Removal notification from a container that disposed itself
    fn remove_container(&self, type_id: TypeId, instance: uuid::Uuid, event_type: &'static str) {
        if self
            .containers
            .remove_if(&type_id, |_, slot| slot.instance() == instance)
            .is_some()
        {
            tracing::debug!(event_type = %event_type, "Registration container removed");
            return;
        }

        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        if self.containers.contains_key(&type_id) {
            tracing::debug!(
                event_type = %event_type,
                "Disposed registration container already replaced"
            );
        } else {
            tracing::warn!(
                event_type = %event_type,
                "Failed to remove disposed registration container"
            );
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let type_ids: Vec<TypeId> = self.containers.iter().map(|e| *e.key()).collect();
        let mut disposed = 0usize;

        for type_id in type_ids {
            let Some((_, container)) = self.containers.remove(&type_id) else {
                // Emptied out and removed itself while we were draining
                continue;
            };

            // Unhook first so the container does not try to remove itself
            container.detach();
            container.dispose();
            disposed += 1;
        }

        tracing::debug!(containers = disposed, "Event hub disposed");
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// In-process typed event hub
///
/// Cheap to clone; clones share the same registrations. The hub is disposed
/// by [`EventHub::dispose`] or when the last clone is dropped.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                containers: DashMap::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Whether the hub has been disposed. Terminal once true.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of event types with a live container
    pub fn event_type_count(&self) -> usize {
        self.inner.containers.len()
    }

    /// Number of live registrations for `T`
    pub fn subscriber_count<T: Event>(&self) -> usize {
        self.inner.lookup::<T>().map_or(0, |c| c.len())
    }

    /// Register a synchronous callback for `T`
    pub fn register<T, F>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register_callback(Arc::new(move |event: T, _: CancellationToken| {
            callback(event);
            future::ready(Ok::<(), SignalError>(())).boxed()
        }))
    }

    /// Register an async callback for `T`
    pub fn register_async<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register_callback(Arc::new(move |event: T, _: CancellationToken| {
            callback(event).boxed()
        }))
    }

    /// Register an async, cancellation-aware callback for `T`
    pub fn register_with_cancel<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register_callback(Arc::new(move |event: T, cancel: CancellationToken| {
            callback(event, cancel).boxed()
        }))
    }

    /// Trigger `event` for every callback registered for `T`
    ///
    /// No subscribers is a successful no-op. A disposed hub logs a warning
    /// and also succeeds.
    pub async fn trigger<T: Event>(&self, event: T) -> Result<()> {
        self.trigger_with_cancel(event, CancellationToken::new())
            .await
    }

    /// Trigger `event`, passing `cancel` through to every callback
    pub async fn trigger_with_cancel<T: Event>(
        &self,
        event: T,
        cancel: CancellationToken,
    ) -> Result<()> {
        if self.is_disposed() {
            tracing::warn!(
                event_type = %short_type_name::<T>(),
                "Attempted to trigger event on disposed event hub"
            );
            return Ok(());
        }

        match self.inner.lookup::<T>() {
            Some(container) => container.trigger(event, cancel).await,
            None => {
                tracing::trace!(
                    event_type = %short_type_name::<T>(),
                    "No registrations for triggered event"
                );
                Ok(())
            }
        }
    }

    /// Dispose every container and registration. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    fn register_callback<T: Event>(&self, callback: Callback<T>) -> Result<Registration> {
        loop {
            if self.is_disposed() {
                return Err(SignalError::disposed("event hub"));
            }

            let container = self.container_for::<T>()?;

            match container.register(callback.clone()) {
                Ok(registration) => {
                    if self.is_disposed() {
                        // Hub teardown may have drained before this container was added
                        self.inner
                            .containers
                            .remove_if(&TypeId::of::<T>(), |_, slot| {
                                slot.instance() == container.instance()
                            });
                        container.detach();
                        container.dispose();
                        return Err(SignalError::disposed("event hub"));
                    }
                    return Ok(registration);
                }
                // The container emptied out between lookup and register;
                // the next pass replaces it with a fresh one
                Err(e) if e.is_disposed() => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Find or atomically create the container for `T`
    fn container_for<T: Event>(&self) -> Result<RegistrationContainer<T>> {
        let type_id = TypeId::of::<T>();
        let mut slot = self
            .inner
            .containers
            .entry(type_id)
            .or_insert_with(|| self.new_container::<T>());

        if slot.is_disposed() {
            *slot = self.new_container::<T>();
        }

        slot.as_any()
            .downcast_ref::<RegistrationContainer<T>>()
            .cloned()
            .ok_or_else(|| {
                SignalError::Internal(format!(
                    "container registered for '{}' has a different event type ('{}')",
                    short_type_name::<T>(),
                    slot.event_type()
                ))
            })
    }

    fn new_container<T: Event>(&self) -> Box<dyn ErasedContainer> {
        let container = RegistrationContainer::<T>::new();
        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        let instance = container.instance();
        let event_type = container.event_type();

        container.set_on_disposed(Box::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.remove_container(TypeId::of::<T>(), instance, event_type);
            }
        }));

        tracing::debug!(event_type = %event_type, "Registration container created");
        Box::new(container)
    }

    #[cfg(test)]
    fn container<T: Event>(&self) -> Option<RegistrationContainer<T>> {
        self.inner.lookup::<T>()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("event_types", &self.event_type_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl EventListener for EventHub {
    fn register<T, F>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) + Send + Sync + 'static,
    {
        EventHub::register(self, callback)
    }

    fn register_async<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        EventHub::register_async(self, callback)
    }

    fn register_with_cancel<T, F, Fut>(&self, callback: F) -> Result<Registration>
    where
        T: Event,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        EventHub::register_with_cancel(self, callback)
    }
}

#[async_trait]
impl EventTrigger for EventHub {
    async fn trigger_with_cancel<T: Event>(
        &self,
        event: T,
        cancel: CancellationToken,
    ) -> Result<()> {
        EventHub::trigger_with_cancel(self, event, cancel).await
    }
}
