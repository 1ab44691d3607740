mod provisioner;
mod state_store;

pub use provisioner::{Provisioner, ResourceRequest};
pub use state_store::StateStore;
