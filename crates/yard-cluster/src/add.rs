//! The add-node workflow.
//!
//! Grows a running cluster by one node: validate the request, derive the
//! new node's identity, adjust shared defaults when this is the first
//! additional node, delegate machine bring-up to the provisioner, and
//! persist the updated profile. On provisioning failure the workflow
//! either fails immediately or, with delete-on-failure, runs the
//! delete-and-retry recovery path exactly once.

use thiserror::Error;
use tracing::{info, warn};

use yard_core::{
    next_node_name, ClusterConfig, DriverKind, Node, OsFlag, OsKind, OsSpecError, ProfileError,
    ProfileStore,
};

use crate::provision::{ProvisionError, Provisioner};

/// Per-VM memory used once a cluster goes multi-node and the operator
/// never set an explicit figure.
pub const MULTI_NODE_MEMORY_MB: u32 = 2200;

/// Caller's request, straight from the CLI flags.
#[derive(Debug, Clone)]
pub struct AddNodeOptions {
    /// Raw `--os` descriptor; empty means a plain linux node.
    pub os: String,
    pub control_plane: bool,
    pub worker: bool,
    pub delete_on_failure: bool,
}

#[derive(Debug, Error)]
pub enum AddNodeError {
    #[error(transparent)]
    Os(#[from] OsSpecError),

    #[error("Windows nodes cannot be used as control-plane nodes")]
    UnsupportedRole,

    #[error("a node needs at least one of the worker or control-plane roles")]
    NoRoleRequested,

    #[error("the {0} driver does not support multi-node clusters")]
    DriverIncapable(DriverKind),

    #[error(
        "adding a control-plane node to a non-HA (non-multi-control-plane) cluster is not \
         supported; delete the cluster and create a new one with the HA option"
    )]
    NotHaConfigured,

    #[error("failed to add node {name}")]
    GuestNodeAddFailed {
        name: String,
        #[source]
        source: ProvisionError,
    },

    #[error("failed to save the cluster profile")]
    Save(#[source] ProfileError),
}

/// Add one node to `cluster`.
///
/// Preconditions short-circuit before any mutation, so a rejected request
/// leaves the cluster config exactly as loaded. On success the new node is
/// appended and the profile persisted; a persistence failure is fatal and
/// is not retried.
pub fn add_node(
    cluster: &mut ClusterConfig,
    opts: &AddNodeOptions,
    provisioner: &dyn Provisioner,
    store: &ProfileStore,
) -> Result<Node, AddNodeError> {
    let os = OsFlag::parse(&opts.os)?.validate()?;

    if opts.control_plane && os.kind == OsKind::Windows {
        return Err(AddNodeError::UnsupportedRole);
    }
    if !opts.worker && !opts.control_plane {
        return Err(AddNodeError::NoRoleRequested);
    }
    if !cluster.driver.supports_multi_node() {
        return Err(AddNodeError::DriverIncapable(cluster.driver));
    }
    if opts.control_plane && !cluster.ha {
        return Err(AddNodeError::NotHaConfigured);
    }

    let name = next_node_name(&cluster.nodes);
    let node = Node {
        name: name.clone(),
        worker: opts.worker,
        control_plane: opts.control_plane,
        // New nodes always join at the cluster's current version.
        kubernetes_version: cluster.kubernetes_version.clone(),
    };
    info!(
        node = %name,
        cluster = %cluster.name,
        roles = ?node.roles(),
        "adding node"
    );

    // First additional node: shrink the per-VM default for a multi-VM
    // footprint, and warn once if the cluster was never set up for
    // multi-node networking.
    if cluster.nodes.len() == 1 {
        if !cluster.memory_explicit {
            cluster.memory_mb = MULTI_NODE_MEMORY_MB;
        }
        if !cluster.multi_node_requested || cluster.cni_disabled {
            warn!(
                "this cluster was not created with multiple nodes in mind; \
                 adding nodes to it may result in broken networking"
            );
        }
    }

    if let Err(err) = provisioner.provision(cluster, &node, opts.delete_on_failure) {
        if opts.delete_on_failure {
            provisioner
                .delete_and_retry(cluster, &node, err)
                .map_err(|source| AddNodeError::GuestNodeAddFailed {
                    name: name.clone(),
                    source,
                })?;
        } else {
            return Err(AddNodeError::GuestNodeAddFailed { name, source: err });
        }
    }

    cluster.nodes.push(node.clone());
    store.save(&cluster.name, cluster).map_err(AddNodeError::Save)?;

    info!(node = %name, cluster = %cluster.name, "node added");
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;
    use yard_exec::ExecError;

    struct FakeProvisioner {
        fail_provision: bool,
        fail_retry: bool,
        provision_calls: Cell<usize>,
        retry_calls: Cell<usize>,
        memory_at_provision: Cell<Option<u32>>,
    }

    impl FakeProvisioner {
        fn with(fail_provision: bool, fail_retry: bool) -> FakeProvisioner {
            FakeProvisioner {
                fail_provision,
                fail_retry,
                provision_calls: Cell::new(0),
                retry_calls: Cell::new(0),
                memory_at_provision: Cell::new(None),
            }
        }

        fn succeeding() -> FakeProvisioner {
            FakeProvisioner::with(false, false)
        }

        fn recovering() -> FakeProvisioner {
            FakeProvisioner::with(true, false)
        }

        fn unrecoverable() -> FakeProvisioner {
            FakeProvisioner::with(true, true)
        }
    }

    fn exec_failure() -> ProvisionError {
        ProvisionError::Exec(ExecError::ExecutionFailed {
            code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
        })
    }

    impl Provisioner for FakeProvisioner {
        fn provision(
            &self,
            cluster: &ClusterConfig,
            _node: &Node,
            _delete_on_failure: bool,
        ) -> Result<(), ProvisionError> {
            self.provision_calls.set(self.provision_calls.get() + 1);
            self.memory_at_provision.set(Some(cluster.memory_mb));
            if self.fail_provision {
                Err(exec_failure())
            } else {
                Ok(())
            }
        }

        fn delete_and_retry(
            &self,
            _cluster: &ClusterConfig,
            _node: &Node,
            prior: ProvisionError,
        ) -> Result<(), ProvisionError> {
            self.retry_calls.set(self.retry_calls.get() + 1);
            if self.fail_retry {
                Err(ProvisionError::RetryFailed {
                    original: Box::new(prior),
                    retry: Box::new(exec_failure()),
                })
            } else {
                Ok(())
            }
        }
    }

    fn cluster() -> ClusterConfig {
        ClusterConfig {
            name: "dev".to_string(),
            driver: DriverKind::Hyperv,
            ha: false,
            multi_node_requested: false,
            kubernetes_version: "v1.31.0".to_string(),
            memory_mb: 4000,
            memory_explicit: false,
            cni_disabled: false,
            nodes: vec![Node {
                name: "m01".to_string(),
                worker: true,
                control_plane: true,
                kubernetes_version: "v1.31.0".to_string(),
            }],
        }
    }

    fn worker_opts() -> AddNodeOptions {
        AddNodeOptions {
            os: String::new(),
            control_plane: false,
            worker: true,
            delete_on_failure: false,
        }
    }

    fn store(dir: &TempDir) -> ProfileStore {
        ProfileStore::with_root(dir.path())
    }

    #[test]
    fn adds_a_worker_node() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();

        let node = add_node(&mut cc, &worker_opts(), &provisioner, &store).unwrap();

        assert_eq!(node.name, "m02");
        assert!(node.worker);
        assert!(!node.control_plane);
        assert_eq!(node.kubernetes_version, "v1.31.0");
        assert_eq!(cc.nodes.len(), 2);
        assert_eq!(provisioner.provision_calls.get(), 1);
        assert_eq!(provisioner.retry_calls.get(), 0);

        // Persisted exactly what is in memory.
        assert_eq!(store.load("dev").unwrap(), cc);
    }

    #[test]
    fn rejects_windows_control_plane_without_mutation() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        cc.ha = true;
        let before = cc.clone();

        let mut opts = worker_opts();
        opts.os = "os=windows,version=2022".to_string();
        opts.control_plane = true;

        let err = add_node(&mut cc, &opts, &provisioner, &store(&dir)).unwrap_err();
        assert!(matches!(err, AddNodeError::UnsupportedRole));
        assert_eq!(cc, before);
        assert_eq!(provisioner.provision_calls.get(), 0);
    }

    #[test]
    fn rejects_invalid_os_descriptor() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();

        let mut opts = worker_opts();
        opts.os = "os=plan9".to_string();

        let err = add_node(&mut cc, &opts, &provisioner, &store(&dir)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid OS: plan9. Valid OS are: linux, windows"
        );
    }

    #[test]
    fn rejects_node_without_any_role() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();

        let mut opts = worker_opts();
        opts.worker = false;

        let err = add_node(&mut cc, &opts, &provisioner, &store(&dir)).unwrap_err();
        assert!(matches!(err, AddNodeError::NoRoleRequested));
    }

    #[test]
    fn rejects_bare_metal_driver() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        cc.driver = DriverKind::None;
        let before = cc.clone();

        let err = add_node(&mut cc, &worker_opts(), &provisioner, &store(&dir)).unwrap_err();
        assert!(matches!(
            err,
            AddNodeError::DriverIncapable(DriverKind::None)
        ));
        assert_eq!(cc, before);
    }

    #[test]
    fn rejects_control_plane_on_non_ha_cluster() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        let before = cc.clone();

        let mut opts = worker_opts();
        opts.control_plane = true;

        let err = add_node(&mut cc, &opts, &provisioner, &store(&dir)).unwrap_err();
        assert!(matches!(err, AddNodeError::NotHaConfigured));
        assert_eq!(cc, before);
        assert_eq!(provisioner.provision_calls.get(), 0);
    }

    #[test]
    fn control_plane_is_allowed_on_ha_cluster() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        cc.ha = true;

        let mut opts = worker_opts();
        opts.control_plane = true;

        let node = add_node(&mut cc, &opts, &provisioner, &store(&dir)).unwrap();
        assert!(node.control_plane);
        assert!(node.worker);
    }

    #[test]
    fn first_additional_node_lowers_default_memory_before_provisioning() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();

        add_node(&mut cc, &worker_opts(), &provisioner, &store(&dir)).unwrap();

        assert_eq!(cc.memory_mb, MULTI_NODE_MEMORY_MB);
        assert_eq!(
            provisioner.memory_at_provision.get(),
            Some(MULTI_NODE_MEMORY_MB)
        );
    }

    #[test]
    fn explicit_memory_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        cc.memory_explicit = true;

        add_node(&mut cc, &worker_opts(), &provisioner, &store(&dir)).unwrap();
        assert_eq!(cc.memory_mb, 4000);
    }

    #[test]
    fn later_nodes_do_not_touch_memory() {
        let dir = TempDir::new().unwrap();
        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();
        cc.nodes.push(Node {
            name: "m02".to_string(),
            worker: true,
            control_plane: false,
            kubernetes_version: "v1.31.0".to_string(),
        });

        let node = add_node(&mut cc, &worker_opts(), &provisioner, &store(&dir)).unwrap();
        assert_eq!(node.name, "m03");
        assert_eq!(cc.memory_mb, 4000);
    }

    #[test]
    fn provisioning_failure_without_recovery_flag_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let provisioner = FakeProvisioner::recovering();
        let mut cc = cluster();

        let err = add_node(&mut cc, &worker_opts(), &provisioner, &store).unwrap_err();
        assert!(matches!(err, AddNodeError::GuestNodeAddFailed { .. }));
        assert_eq!(provisioner.retry_calls.get(), 0);
        assert_eq!(cc.nodes.len(), 1);
        // Nothing was persisted.
        assert!(matches!(
            store.load("dev"),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn recovery_runs_exactly_once_and_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let provisioner = FakeProvisioner::recovering();
        let mut cc = cluster();

        let mut opts = worker_opts();
        opts.delete_on_failure = true;

        let node = add_node(&mut cc, &opts, &provisioner, &store).unwrap();
        assert_eq!(node.name, "m02");
        assert_eq!(provisioner.provision_calls.get(), 1);
        assert_eq!(provisioner.retry_calls.get(), 1);
        assert_eq!(store.load("dev").unwrap().nodes.len(), 2);
    }

    #[test]
    fn failed_recovery_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let provisioner = FakeProvisioner::unrecoverable();
        let mut cc = cluster();

        let mut opts = worker_opts();
        opts.delete_on_failure = true;

        let err = add_node(&mut cc, &opts, &provisioner, &store).unwrap_err();
        match err {
            AddNodeError::GuestNodeAddFailed { name, source } => {
                assert_eq!(name, "m02");
                assert!(matches!(source, ProvisionError::RetryFailed { .. }));
            }
            other => panic!("expected GuestNodeAddFailed, got {other:?}"),
        }
        assert_eq!(provisioner.retry_calls.get(), 1);
        assert_eq!(cc.nodes.len(), 1);
    }

    #[test]
    fn save_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        // Point the store root at a regular file so the profile directory
        // cannot be created.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = ProfileStore::with_root(&blocker);

        let provisioner = FakeProvisioner::succeeding();
        let mut cc = cluster();

        let err = add_node(&mut cc, &worker_opts(), &provisioner, &store).unwrap_err();
        assert!(matches!(err, AddNodeError::Save(_)));
    }
}
