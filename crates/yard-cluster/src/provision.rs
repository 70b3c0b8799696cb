//! The provisioning seam of the add-node workflow.

use thiserror::Error;

use yard_core::{ClusterConfig, Node};
use yard_exec::ExecError;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("cluster recovery failed: {retry} (original failure: {original})")]
    RetryFailed {
        original: Box<ProvisionError>,
        retry: Box<ProvisionError>,
    },
}

/// Brings cluster machines up and tears them down.
///
/// Provisioning is potentially long-running and may fail partway; the
/// workflow in [`crate::add_node`] treats it as opaque and only decides
/// whether to invoke the recovery path. Tests substitute fakes.
pub trait Provisioner {
    /// Provision the machine for `node` and join it to the cluster.
    fn provision(
        &self,
        cluster: &ClusterConfig,
        node: &Node,
        delete_on_failure: bool,
    ) -> Result<(), ProvisionError>;

    /// Recovery path: tear the cluster down and bring it back up once,
    /// including `node`. Invoked at most once per add attempt, with the
    /// provisioning failure as context.
    fn delete_and_retry(
        &self,
        cluster: &ClusterConfig,
        node: &Node,
        prior: ProvisionError,
    ) -> Result<(), ProvisionError>;
}
