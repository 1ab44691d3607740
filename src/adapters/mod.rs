pub mod memory_state_store;
pub mod provisioner_http;
pub mod simulated_provisioner;
pub mod state_store_filesystem;

pub use memory_state_store::MemoryStateStore;
pub use provisioner_http::HttpProvisioner;
pub use simulated_provisioner::SimulatedProvisioner;
pub use state_store_filesystem::FilesystemStateStore;
