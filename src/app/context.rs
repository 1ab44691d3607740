use crate::ports::{Provisioner, StateStore};

/// Application context holding dependencies for command execution.
pub struct AppContext<P: Provisioner, S: StateStore> {
    provisioner: P,
    state_store: S,
}

impl<P: Provisioner, S: StateStore> AppContext<P, S> {
    /// Create a new application context.
    pub fn new(provisioner: P, state_store: S) -> Self {
        Self { provisioner, state_store }
    }

    /// Get a reference to the provisioning engine.
    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Get a reference to the state store.
    pub fn state_store(&self) -> &S {
        &self.state_store
    }
}
