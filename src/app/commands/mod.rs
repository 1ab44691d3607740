pub mod apply;
pub mod graph;
pub mod init;
pub mod outputs;
pub mod plan;
