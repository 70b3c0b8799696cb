//! Cluster workflows for kubeyard.
//!
//! The central piece is [`add_node`]: the workflow that safely grows a
//! running cluster by one node. Actual machine bring-up sits behind the
//! [`Provisioner`] trait; [`HypervProvisioner`] is the shell-driven
//! implementation for Hyper-V backed clusters.

pub mod add;
pub mod hyperv;
pub mod provision;

pub use add::{add_node, AddNodeError, AddNodeOptions, MULTI_NODE_MEMORY_MB};
pub use hyperv::HypervProvisioner;
pub use provision::{ProvisionError, Provisioner};
