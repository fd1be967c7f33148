//! Command-line arguments, grounded on the sibling `nova-node` binary's
//! `cli.rs` (`clap` derive, `env` fallbacks).

use clap::Parser;

/// Drives a random connected graph of stratum nodes over localhost UDP,
/// the `stratum-net` analog of `dmc.cc`'s ns-3 simulation setup.
#[derive(Parser, Debug)]
#[command(name = "stratum-sim", about = "Stratum clustering protocol simulator", version)]
pub struct Args {
    /// Number of nodes in the simulated graph.
    #[arg(long, env = "STRATUM_NUM_NODES", default_value_t = 10)]
    pub num_nodes: u32,

    /// Extra edges added per node beyond the spanning tree that guarantees
    /// connectivity (higher values produce a denser graph).
    #[arg(long, env = "STRATUM_BRANCH_FACTOR", default_value_t = 2)]
    pub branch_factor: u32,

    /// How long to run the simulation before shutting every node down.
    #[arg(long, env = "STRATUM_SECS_TO_RUN", default_value_t = 30)]
    pub secs_to_run: u64,

    /// First UDP port used; node `i` binds to `base_port + i`.
    #[arg(long, env = "STRATUM_BASE_PORT", default_value_t = 31000)]
    pub base_port: u16,

    /// Seed for the graph-construction and per-node random sources.
    #[arg(long, env = "STRATUM_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Emit structured JSON log lines instead of pretty-printed ones.
    #[arg(long, env = "STRATUM_JSON_EVENTS")]
    pub json_events: bool,

    /// Default `RUST_LOG` directive when the environment variable is unset.
    #[arg(long, default_value = "stratum_sim=info,stratum_net=info,stratum_core=info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Args::command().debug_assert();
    }
}
