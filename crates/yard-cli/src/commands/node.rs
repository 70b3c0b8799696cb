use yard_cluster::{add_node, AddNodeOptions, HypervProvisioner};
use yard_core::ProfileStore;
use yard_exec::HostShell;

pub fn add(
    profile: &str,
    control_plane: bool,
    worker: bool,
    delete_on_failure: bool,
    os: &str,
) -> anyhow::Result<()> {
    let store = ProfileStore::open_default()?;
    let mut cluster = store.load(profile)?;

    let shell = HostShell::resolve();
    let provisioner = HypervProvisioner::new(&shell);
    let opts = AddNodeOptions {
        os: os.to_string(),
        control_plane,
        worker,
        delete_on_failure,
    };

    match add_node(&mut cluster, &opts, &provisioner, &store) {
        Ok(node) => {
            println!(
                "✓ Added {} to {} as {}",
                node.name,
                cluster.name,
                node.roles().join(",")
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("Adding node failed: {err}");
            Err(err.into())
        }
    }
}

pub fn list(profile: &str, format: &str) -> anyhow::Result<()> {
    let store = ProfileStore::open_default()?;
    let cluster = store.load(profile)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&cluster.nodes)?);
        }
        _ => {
            for node in &cluster.nodes {
                println!("{}\t{}", node.name, node.roles().join(","));
            }
        }
    }

    Ok(())
}
