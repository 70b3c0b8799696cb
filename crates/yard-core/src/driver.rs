//! Hypervisor drivers a cluster can be backed by.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Driver backing the cluster's machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Hyperv,
    Virtualbox,
    Qemu,
    Docker,
    /// Bare-metal: the cluster runs directly on the host.
    None,
}

impl DriverKind {
    /// Whether the driver can host more than one node. The bare-metal
    /// driver has only the host itself to run on.
    pub fn supports_multi_node(&self) -> bool {
        !matches!(self, DriverKind::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Hyperv => "hyperv",
            DriverKind::Virtualbox => "virtualbox",
            DriverKind::Qemu => "qemu",
            DriverKind::Docker => "docker",
            DriverKind::None => "none",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
