//! Shell-driven provisioner for Hyper-V backed clusters.
//!
//! Drives the Hyper-V cmdlets through a [`CommandRunner`], so the same
//! code provisions against the local host shell or a remote hypervisor
//! host over SSH.

use tracing::{info, warn};

use yard_core::{ClusterConfig, Node};
use yard_exec::CommandRunner;

use crate::provision::{ProvisionError, Provisioner};

pub struct HypervProvisioner<'r> {
    runner: &'r dyn CommandRunner,
}

impl<'r> HypervProvisioner<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> HypervProvisioner<'r> {
        HypervProvisioner { runner }
    }

    fn vm_name(cluster: &ClusterConfig, node: &Node) -> String {
        format!("{}-{}", cluster.name, node.name)
    }

    fn create_vm(&self, cluster: &ClusterConfig, node: &Node) -> Result<(), ProvisionError> {
        let vm = Self::vm_name(cluster, node);
        let memory = format!("{}MB", cluster.memory_mb);
        self.runner.run(&[
            "Hyper-V\\New-VM",
            "-Name",
            &vm,
            "-MemoryStartupBytes",
            &memory,
            "-Generation",
            "2",
        ])?;
        self.runner.run(&["Hyper-V\\Start-VM", "-Name", &vm])?;
        info!(%vm, "started guest machine");
        Ok(())
    }

    fn remove_vm(&self, cluster: &ClusterConfig, node: &Node) {
        let vm = Self::vm_name(cluster, node);
        if let Err(err) = self
            .runner
            .run(&["Hyper-V\\Stop-VM", "-Name", &vm, "-TurnOff", "-Force"])
        {
            warn!(%vm, %err, "could not stop guest machine");
        }
        if let Err(err) = self
            .runner
            .run(&["Hyper-V\\Remove-VM", "-Name", &vm, "-Force"])
        {
            warn!(%vm, %err, "could not remove guest machine");
        }
    }
}

impl Provisioner for HypervProvisioner<'_> {
    fn provision(
        &self,
        cluster: &ClusterConfig,
        node: &Node,
        _delete_on_failure: bool,
    ) -> Result<(), ProvisionError> {
        info!(node = %node.name, cluster = %cluster.name, "provisioning node");
        self.create_vm(cluster, node)
    }

    fn delete_and_retry(
        &self,
        cluster: &ClusterConfig,
        node: &Node,
        prior: ProvisionError,
    ) -> Result<(), ProvisionError> {
        warn!(error = %prior, "provisioning failed, deleting the cluster and retrying once");

        // Tear down: every existing machine plus whatever the failed
        // attempt left behind.
        for existing in &cluster.nodes {
            self.remove_vm(cluster, existing);
        }
        self.remove_vm(cluster, node);

        let outcome = (|| {
            for existing in &cluster.nodes {
                self.create_vm(cluster, existing)?;
            }
            self.create_vm(cluster, node)
        })();

        outcome.map_err(|retry| ProvisionError::RetryFailed {
            original: Box::new(prior),
            retry: Box::new(retry),
        })
    }
}
