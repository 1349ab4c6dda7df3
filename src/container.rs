//! Per-event-type registration container
//!
//! A `RegistrationContainer<T>` holds every live callback for one event
//! type. It fans triggers out to a snapshot of those callbacks and
//! disposes itself once its last registration is disposed.

use crate::error::{Result, SignalError};
use crate::registration::{lock, Registration, RegistrationState};
use crate::types::{short_type_name, Callback, Event, RegistrationId};
use dashmap::DashMap;
use futures::future::{join_all, FutureExt};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio_util::sync::CancellationToken;

/// Notification run once when a container finishes disposing
pub(crate) type ContainerHook = Box<dyn FnOnce() + Send>;

struct Entry<T> {
    state: Arc<RegistrationState>,
    callback: Callback<T>,
}

struct ContainerInner<T> {
    event_type: &'static str,
    instance: uuid::Uuid,
    entries: DashMap<RegistrationId, Entry<T>>,
    disposed: AtomicBool,
    /// Serialises `register` against the decision to dispose
    lifecycle: Mutex<()>,
    on_disposed: Mutex<Option<ContainerHook>>,
    #[cfg(test)]
    dispose_runs: std::sync::atomic::AtomicUsize,
}

impl<T: Event> ContainerInner<T> {
    fn on_registration_disposed(&self, id: RegistrationId) {
        if self.entries.remove(&id).is_none() {
            if !self.disposed.load(Ordering::SeqCst) {
                tracing::warn!(
                    event_type = %self.event_type,
                    registration = %id,
                    "Failed to remove callback for disposed registration"
                );
            }
            return;
        }

        let emptied = {
            let _guard = lock(&self.lifecycle);
            self.entries.is_empty() && !self.disposed.swap(true, Ordering::SeqCst)
        };

        if emptied {
            tracing::debug!(
                event_type = %self.event_type,
                "Last registration disposed, disposing container"
            );
            self.finish_dispose();
        }
    }

    fn dispose(&self) {
        {
            let _guard = lock(&self.lifecycle);
            if self.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.finish_dispose();
    }

    /// Drain remaining registrations and notify the owner. Runs once,
    /// after the disposed flag has been claimed.
    fn finish_dispose(&self) {
        #[cfg(test)]
        self.dispose_runs.fetch_add(1, Ordering::SeqCst);

        let ids: Vec<RegistrationId> = self.entries.iter().map(|e| *e.key()).collect();
        for id in ids {
            // Removed first so the registration's own hook finds nothing to do
            if let Some((_, entry)) = self.entries.remove(&id) {
                entry.state.dispose();
            }
        }

        let hook = lock(&self.on_disposed).take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// Live callbacks for a single event type
pub struct RegistrationContainer<T: Event> {
    inner: Arc<ContainerInner<T>>,
}

impl<T: Event> Clone for RegistrationContainer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Event> Default for RegistrationContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Event> RegistrationContainer<T> {
    /// Create an empty container for `T`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                event_type: short_type_name::<T>(),
                instance: uuid::Uuid::new_v4(),
                entries: DashMap::new(),
                disposed: AtomicBool::new(false),
                lifecycle: Mutex::new(()),
                on_disposed: Mutex::new(None),
                #[cfg(test)]
                dispose_runs: std::sync::atomic::AtomicUsize::new(0),
            }),
        }
    }

    /// Short name of the event type this container serves
    pub fn event_type(&self) -> &'static str {
        self.inner.event_type
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether no registrations are live
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Whether the container has been disposed. Terminal once true.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn instance(&self) -> uuid::Uuid {
        self.inner.instance
    }

    /// Install the owner's disposal notification, replacing any previous one
    pub(crate) fn set_on_disposed(&self, hook: ContainerHook) {
        *lock(&self.inner.on_disposed) = Some(hook);
    }

    /// Drop the owner's disposal notification without running it
    pub(crate) fn detach(&self) {
        lock(&self.inner.on_disposed).take();
    }

    /// Register a normalised callback
    ///
    /// Fails with [`SignalError::Disposed`] once the container is disposed,
    /// including when disposal races with this call.
    pub fn register(&self, callback: Callback<T>) -> Result<Registration> {
        let _guard = lock(&self.inner.lifecycle);

        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(SignalError::disposed(format!(
                "registration container for '{}'",
                self.inner.event_type
            )));
        }

        let container: Weak<ContainerInner<T>> = Arc::downgrade(&self.inner);
        let state = RegistrationState::new(
            self.inner.event_type,
            Box::new(move |id| {
                if let Some(inner) = container.upgrade() {
                    inner.on_registration_disposed(id);
                }
            }),
        );

        self.inner.entries.insert(
            state.id(),
            Entry {
                state: state.clone(),
                callback,
            },
        );

        Ok(Registration::new(state))
    }

    /// Invoke every live callback concurrently and wait for all of them
    ///
    /// Triggering a disposed container logs a warning and succeeds. Callback
    /// errors and panics are collected into [`SignalError::Trigger`] after
    /// every callback has finished.
    pub async fn trigger(&self, event: T, cancel: CancellationToken) -> Result<()> {
        if self.is_disposed() {
            tracing::warn!(
                event_type = %self.inner.event_type,
                "Attempted to trigger event on disposed registration container"
            );
            return Ok(());
        }

        let callbacks: Vec<Callback<T>> = self
            .inner
            .entries
            .iter()
            .filter(|entry| !entry.state.is_disposed())
            .map(|entry| entry.callback.clone())
            .collect();

        if callbacks.is_empty() {
            return Ok(());
        }

        let total = callbacks.len();
        tracing::trace!(event_type = %self.inner.event_type, handlers = total, "Triggering event");

        let invocations = callbacks.into_iter().map(|callback| {
            let event = event.clone();
            let cancel = cancel.clone();
            AssertUnwindSafe(async move { callback(event, cancel).await }).catch_unwind()
        });

        let failures: Vec<SignalError> = join_all(invocations)
            .await
            .into_iter()
            .filter_map(|outcome| match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(panic) => Some(SignalError::Panicked {
                    event_type: self.inner.event_type.to_string(),
                    message: panic_message(panic.as_ref()),
                }),
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SignalError::Trigger {
                event_type: self.inner.event_type.to_string(),
                total,
                failures,
            })
        }
    }

    /// Dispose every remaining registration, then notify the owner. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[cfg(test)]
    pub(crate) fn dispose_runs(&self) -> usize {
        self.inner.dispose_runs.load(Ordering::SeqCst)
    }
}

impl<T: Event> fmt::Debug for RegistrationContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationContainer")
            .field("event_type", &self.inner.event_type)
            .field("registrations", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Type-erased view the hub keeps per event type
pub(crate) trait ErasedContainer: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn event_type(&self) -> &'static str;
    fn instance(&self) -> uuid::Uuid;
    fn is_disposed(&self) -> bool;
    fn detach(&self);
    fn dispose(&self);
}

impl<T: Event> ErasedContainer for RegistrationContainer<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn event_type(&self) -> &'static str {
        RegistrationContainer::event_type(self)
    }

    fn instance(&self) -> uuid::Uuid {
        RegistrationContainer::instance(self)
    }

    fn is_disposed(&self) -> bool {
        RegistrationContainer::is_disposed(self)
    }

    fn detach(&self) {
        RegistrationContainer::detach(self)
    }

    fn dispose(&self) {
        RegistrationContainer::dispose(self)
    }
}
