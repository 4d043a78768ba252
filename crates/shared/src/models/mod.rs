pub mod cluster;
pub mod node;

pub use node::NodeStatus;
