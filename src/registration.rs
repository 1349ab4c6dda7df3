//! Registration handles — one per `register` call
//!
//! A `Registration` is the caller's capability to unsubscribe. Disposal is
//! one-shot: the first `dispose` notifies the owning container exactly once,
//! every later call is a no-op.

use crate::types::RegistrationId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Notification run once when a registration is disposed
pub(crate) type DisposeHook = Box<dyn FnOnce(RegistrationId) + Send>;

/// Lock a mutex, recovering the guard if a previous holder panicked
///
/// Every mutex in this crate guards either `()` or an `Option` that is
/// only ever `take`n, so a poisoned guard is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state behind a registration, also held by its container
pub(crate) struct RegistrationState {
    id: RegistrationId,
    event_type: &'static str,
    disposed: AtomicBool,
    on_disposed: Mutex<Option<DisposeHook>>,
}

impl RegistrationState {
    pub(crate) fn new(event_type: &'static str, on_disposed: DisposeHook) -> Arc<Self> {
        Arc::new(Self {
            id: RegistrationId::new(),
            event_type,
            disposed: AtomicBool::new(false),
            on_disposed: Mutex::new(Some(on_disposed)),
        })
    }

    pub(crate) fn id(&self) -> RegistrationId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Claim the disposed flag, then run the hook if this call won
    ///
    /// The flag is claimed first so a dispose re-entered from inside the
    /// hook is already a no-op.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let hook = lock(&self.on_disposed).take();
        if let Some(hook) = hook {
            hook(self.id);
        }
    }
}

/// Handle for a single registered callback
///
/// Dropping the handle disposes it. Call [`Registration::detach`] to keep
/// the callback registered for as long as its container lives.
#[must_use = "dropping a Registration unregisters its callback; call `detach` to keep it"]
pub struct Registration {
    state: Arc<RegistrationState>,
    dispose_on_drop: bool,
}

impl Registration {
    pub(crate) fn new(state: Arc<RegistrationState>) -> Self {
        Self {
            state,
            dispose_on_drop: true,
        }
    }

    /// Unique id of this registration
    pub fn id(&self) -> RegistrationId {
        self.state.id
    }

    /// Short name of the event type this registration listens to
    pub fn event_type(&self) -> &'static str {
        self.state.event_type
    }

    /// Whether the registration has been disposed (by the caller or its container)
    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }

    /// Unregister the callback. Idempotent.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    /// Give up the guard without unregistering
    ///
    /// The callback stays live until its container or hub is disposed.
    pub fn detach(mut self) {
        self.dispose_on_drop = false;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.dispose_on_drop {
            self.state.dispose();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.state.id)
            .field("event_type", &self.state.event_type)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
