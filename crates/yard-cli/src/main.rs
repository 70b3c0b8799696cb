use clap::{ArgAction, Parser, Subcommand};

mod commands;

const OS_LONG_HELP: &str = "\
This flag should only be used when adding a Windows node to a cluster.

Specify the OS of the node to add in the format 'os=OS_TYPE,version=VERSION'. \
For example, 'os=windows,version=2022' adds a Windows node running Windows \
Server 2022.

    $ kubeyard node add --os 'os=windows,version=2022'

Valid options for OS_TYPE are: linux, windows. If not specified, the node is \
a linux node and the flag can be left out entirely.";

#[derive(Parser)]
#[command(
    name = "kubeyard",
    about = "kubeyard — local multi-node Kubernetes clusters on your own hypervisor",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the nodes of a cluster
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    /// Add a node to the given cluster and start it
    Add {
        /// Cluster profile to operate on
        #[arg(short, long, default_value = "kubeyard")]
        profile: String,
        /// If set, the added node becomes a control-plane. Only supported
        /// for existing HA (multi-control-plane) clusters.
        #[arg(long)]
        control_plane: bool,
        /// If set, the added node is available as a worker
        #[arg(
            long,
            default_value_t = true,
            action = ArgAction::Set,
            num_args = 0..=1,
            default_missing_value = "true"
        )]
        worker: bool,
        /// If set, delete the cluster and try again once if adding the
        /// node fails
        #[arg(long)]
        delete_on_failure: bool,
        /// OS descriptor for the node
        #[arg(long, default_value = "", long_help = OS_LONG_HELP)]
        os: String,
    },
    /// List the nodes of a cluster
    List {
        /// Cluster profile to operate on
        #[arg(short, long, default_value = "kubeyard")]
        profile: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Node { action } => match action {
            NodeAction::Add {
                profile,
                control_plane,
                worker,
                delete_on_failure,
                os,
            } => commands::node::add(&profile, control_plane, worker, delete_on_failure, &os),
            NodeAction::List { profile, format } => commands::node::list(&profile, &format),
        },
    }
}
