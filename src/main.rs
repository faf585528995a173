use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use tokio::time::sleep;

use herald::network::metrics;
use herald::{Config, PeerHandle, PeerId};

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Randomized-timeout leader election between UDP peers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one peer until interrupted
    Node {
        /// Id of this peer; it listens on base port + id
        #[arg(short, long)]
        id: PeerId,

        /// Comma-separated ids of every cluster member, including this one
        #[arg(short, long, value_delimiter = ',')]
        members: Option<Vec<PeerId>>,

        /// Address every peer listens on
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port of peer 0
        #[arg(short, long)]
        base_port: Option<u16>,

        /// JSON config file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a whole cluster inside this process and report where it settled
    Cluster {
        /// Number of peers
        #[arg(short, long, default_value_t = 5)]
        size: u64,

        /// How long to let the cluster run
        #[arg(short, long, default_value_t = 30)]
        duration_secs: u64,

        /// Port of peer 0
        #[arg(short, long, default_value_t = 5000)]
        base_port: u16,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

async fn run_node(
    id: PeerId,
    members: Option<Vec<PeerId>>,
    host: Option<IpAddr>,
    base_port: Option<u16>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    config.node_id = id;
    if let Some(members) = members {
        config.members = members;
    }
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(base_port) = base_port {
        config.base_port = base_port;
    }

    let handle = PeerHandle::bind_udp(&config)
        .await
        .with_context(|| format!("starting peer {id}"))?;
    info!(
        "Peer {id} listening on {}, press Ctrl-C to stop",
        config.peer_addr(id)?
    );

    tokio::signal::ctrl_c().await?;

    let state = handle.stop().await?;
    info!(
        "Peer {} shut down at term {} as {}",
        state.id, state.current_term, state.role
    );
    Ok(())
}

async fn run_cluster(size: u64, duration_secs: u64, base_port: u16) -> anyhow::Result<()> {
    if size == 0 {
        bail!("a cluster needs at least one peer");
    }

    let members: Vec<PeerId> = (0..size).collect();
    let mut handles = Vec::with_capacity(members.len());
    for &id in &members {
        let config = Config {
            base_port,
            ..Config::for_node(id, members.clone())
        };
        let handle = PeerHandle::bind_udp(&config)
            .await
            .with_context(|| format!("starting peer {id}"))?;
        handles.push(handle);
    }
    info!("Started {size} peers, running for {duration_secs}s");

    tokio::select! {
        _ = sleep(Duration::from_secs(duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping cluster"),
    }

    for handle in handles {
        let state = handle.stop().await?;
        println!("{}", serde_json::to_string(&state)?);
    }
    println!("{}", serde_json::to_string(&metrics::snapshot())?);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Node {
            id,
            members,
            host,
            base_port,
            config,
        } => run_node(id, members, host, base_port, config).await,
        Command::Cluster {
            size,
            duration_secs,
            base_port,
        } => run_cluster(size, duration_secs, base_port).await,
    }
}
