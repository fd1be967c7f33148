//! Glues `stratum_core`'s dispatcher to the UDP transport and gossip
//! timer: one `tokio` task per node, owning its `NodeState` exclusively.
//! No `Arc<Mutex<_>>` is needed around the dispatcher because there is
//! exactly one task per node (§5).

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::oneshot;

use stratum_core::event::TracingSink;
use stratum_core::NodeState;

use crate::config::Config;
use crate::timer::GossipTimer;
use crate::transport::UdpTransport;

/// Runs a node to completion. Returns once `shutdown` fires; the in-flight
/// select arm, if any, is allowed to finish (no message is partially
/// applied), after which no further transmit is scheduled and the socket
/// is dropped.
pub async fn run_node(config: Config, shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
    let transport = UdpTransport::bind(config.bind, config.neighbors.clone()).await?;
    let mut node = NodeState::new(config.my_id, config.my_value, Box::new(TracingSink));
    let timer = GossipTimer::default();
    let mut rng = StdRng::from_entropy();
    let neighbor_ids = transport.neighbor_ids();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(node = config.my_id, "shutting down");
                return Ok(());
            }
            _ = timer.tick(&mut rng) => {
                if let Some(to) = GossipTimer::pick_neighbor(&neighbor_ids, &mut rng) {
                    let payload = node.encode();
                    match transport.send(to, &payload).await {
                        Ok(()) => node.record_send(to, payload.len()),
                        Err(err) => tracing::warn!(node = config.my_id, to, %err, "gossip send failed"),
                    }
                }
            }
            recv = transport.recv() => {
                match recv {
                    Ok((_from, payload)) => {
                        if let Err(err) = node.on_receive(&payload, &mut rng) {
                            tracing::debug!(node = config.my_id, %err, "dropping malformed message");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(node = config.my_id, %err, "transport receive failed");
                    }
                }
            }
        }
    }
}
