//! Grouped registrations disposed together
//!
//! Components that listen to several event types keep their handles in a
//! `RegistrationSet` and tear them all down in one call (or on drop).

use crate::registration::Registration;

/// A bag of registrations with a single disposal point
#[derive(Debug, Default)]
pub struct RegistrationSet {
    registrations: Vec<Registration>,
}

impl RegistrationSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration to the set
    pub fn push(&mut self, registration: Registration) {
        self.registrations.push(registration);
    }

    /// Add a registration, builder style
    pub fn with(mut self, registration: Registration) -> Self {
        self.push(registration);
        self
    }

    /// Number of registrations held
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the set holds no registrations
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Dispose every registration and empty the set
    pub fn dispose(&mut self) {
        for registration in self.registrations.drain(..) {
            registration.dispose();
        }
    }
}

impl Drop for RegistrationSet {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Extend<Registration> for RegistrationSet {
    fn extend<I: IntoIterator<Item = Registration>>(&mut self, iter: I) {
        self.registrations.extend(iter);
    }
}

impl FromIterator<Registration> for RegistrationSet {
    fn from_iter<I: IntoIterator<Item = Registration>>(iter: I) -> Self {
        Self {
            registrations: iter.into_iter().collect(),
        }
    }
}
