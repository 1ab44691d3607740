pub mod broker;

pub use broker::broker_stack;
