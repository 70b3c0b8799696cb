//! Node descriptors and node-name allocation.
//!
//! Node names encode a numeric id (`m01`, `m02`, ...). The next name is
//! derived from the id of the last node in the cluster, so identities stay
//! monotonically increasing and collision-free as long as nodes are never
//! renamed out of band.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// One member of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub worker: bool,
    pub control_plane: bool,
    pub kubernetes_version: String,
}

impl Node {
    /// Role labels for display, in worker-first order.
    pub fn roles(&self) -> Vec<&'static str> {
        let mut roles = Vec::new();
        if self.worker {
            roles.push("worker");
        }
        if self.control_plane {
            roles.push("control-plane");
        }
        roles
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeNameError {
    #[error("node name {0:?} does not encode a numeric id")]
    Unparsable(String),
}

/// Format the node name encoding `id`.
pub fn node_name(id: usize) -> String {
    format!("m{id:02}")
}

/// Extract the id encoded in a node name. Inverse of [`node_name`].
pub fn node_id(name: &str) -> Result<usize, NodeNameError> {
    name.strip_prefix('m')
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| NodeNameError::Unparsable(name.to_string()))
}

/// Compute the name for the next node to add.
///
/// Uses the id of the last existing node. A last node with a malformed or
/// legacy name degrades to the node count instead of failing; the
/// allocation still proceeds.
pub fn next_node_name(nodes: &[Node]) -> String {
    let last_id = match nodes.last() {
        Some(last) => match node_id(&last.name) {
            Ok(id) => id,
            Err(err) => {
                warn!(%err, assumed = nodes.len(), "determining last node index");
                nodes.len()
            }
        },
        None => 0,
    };
    node_name(last_id + 1)
}
