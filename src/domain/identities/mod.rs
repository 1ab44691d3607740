pub mod logical_name;
pub mod validation;

pub use logical_name::LogicalName;
