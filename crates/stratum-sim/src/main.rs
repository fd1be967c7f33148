//! Simulation binary: builds a random connected graph of nodes and drives
//! them over real UDP sockets on localhost, the `stratum-net` analog of
//! `dmc.cc`'s ns-3 simulation setup.

mod cli;
mod graph;
mod logging;

use std::collections::HashMap;
use std::net::SocketAddr;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::Rng;
use tokio::sync::oneshot;

use stratum_net::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let format = if args.json_events {
        logging::LogFormat::Json
    } else {
        logging::LogFormat::Pretty
    };
    logging::init_logging(&args.log_level, format);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let adjacency = graph::build_graph(args.num_nodes, args.branch_factor, &mut rng);

    let addrs: HashMap<u32, SocketAddr> = (1..=args.num_nodes)
        .map(|id| {
            let port = args.base_port + id as u16;
            (id, format!("127.0.0.1:{port}").parse().unwrap())
        })
        .collect();

    let mut shutdowns = Vec::with_capacity(args.num_nodes as usize);
    let mut handles = Vec::with_capacity(args.num_nodes as usize);

    for id in 1..=args.num_nodes {
        let neighbors = adjacency[&id]
            .iter()
            .map(|&n| (n, addrs[&n]))
            .collect::<HashMap<_, _>>();
        let config = Config {
            my_id: id,
            my_value: rng.gen::<f64>(),
            bind: addrs[&id],
            neighbors,
            json_events: args.json_events,
        };
        let (tx, rx) = oneshot::channel();
        shutdowns.push(tx);
        handles.push(tokio::spawn(stratum_net::run_node(config, rx)));
    }

    tracing::info!(
        num_nodes = args.num_nodes,
        secs_to_run = args.secs_to_run,
        "simulation started"
    );
    tokio::time::sleep(tokio::time::Duration::from_secs(args.secs_to_run)).await;

    for tx in shutdowns {
        let _ = tx.send(());
    }
    for handle in handles {
        if let Err(err) = handle.await? {
            tracing::warn!(%err, "node task exited with an error");
        }
    }

    tracing::info!("simulation complete");
    Ok(())
}
