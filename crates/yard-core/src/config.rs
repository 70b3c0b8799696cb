//! Cluster configuration model.
//!
//! A `ClusterConfig` is the working copy of one cluster profile. The
//! profile store owns it between command invocations; a command loads it,
//! mutates it, and hands it back for persistence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::DriverKind;
use crate::node::Node;

/// One cluster profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    pub driver: DriverKind,
    /// Configured for multiple control-plane nodes.
    #[serde(default)]
    pub ha: bool,
    /// The operator asked for a multi-node topology at creation time.
    #[serde(default)]
    pub multi_node_requested: bool,
    pub kubernetes_version: String,
    /// Per-VM memory allocation in MB.
    pub memory_mb: u32,
    /// Whether `memory_mb` was set explicitly by the operator, as opposed
    /// to the creation-time default.
    #[serde(default)]
    pub memory_explicit: bool,
    /// The cluster was created without a CNI.
    #[serde(default)]
    pub cni_disabled: bool,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterConfigError {
    #[error("cluster {0} has no nodes")]
    NoNodes(String),

    #[error("cluster {0} has more than one node named {1}")]
    DuplicateNodeName(String, String),
}

impl ClusterConfig {
    /// Structural invariants: a cluster always has at least its primary
    /// node, and node names are unique.
    pub fn validate(&self) -> Result<(), ClusterConfigError> {
        if self.nodes.is_empty() {
            return Err(ClusterConfigError::NoNodes(self.name.clone()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if self.nodes[..i].iter().any(|seen| seen.name == node.name) {
                return Err(ClusterConfigError::DuplicateNodeName(
                    self.name.clone(),
                    node.name.clone(),
                ));
            }
        }
        Ok(())
    }
}
