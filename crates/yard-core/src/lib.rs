//! Core types for kubeyard — cluster profiles, node identity, and the
//! OS descriptor accepted when adding nodes.

pub mod config;
pub mod driver;
pub mod node;
pub mod os;
pub mod profile;

pub use config::{ClusterConfig, ClusterConfigError};
pub use driver::DriverKind;
pub use node::{next_node_name, node_id, node_name, Node, NodeNameError};
pub use os::{OsFlag, OsKind, OsSpec, OsSpecError};
pub use profile::{ProfileError, ProfileStore};
