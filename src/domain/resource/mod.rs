pub mod descriptor;
pub mod kind;
pub mod value;

pub use descriptor::{Attributes, Descriptor, Fields, ResourceHandle, ResourceOptions};
pub use kind::{FieldShape, FieldSpec, ResourceKind, UpdateMode};
pub use value::{Rendering, Value};
