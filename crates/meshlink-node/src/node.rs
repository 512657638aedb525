//! A meshlink node assembled from [`NodeConfig`].

use std::time::Duration;

use tokio::task::JoinHandle;

use meshlink_bootstrap::NetworkKind;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::runtime::{MeshHandle, MeshRuntime};
use crate::sim::{SimulatedStack, SimulationSettings};

/// A running node: the runtime task plus a handle to drive it.
pub struct Node {
    handle: MeshHandle,
    task: JoinHandle<()>,
}

impl Node {
    /// Build the tasklet and simulated stack from `config` and spawn the
    /// runtime. Thread nodes get their device identity applied before this
    /// returns.
    pub async fn start(config: &NodeConfig) -> Result<Self, NodeError> {
        let kind = config.network_kind()?;
        let eui64 = config.eui64()?;
        let settings = SimulationSettings {
            scan_failures: config.simulation.scan_failures,
            response_delay: Duration::from_millis(config.simulation.response_delay_ms),
        };
        let network = match &kind {
            NetworkKind::Thread(thread) => Some((thread.mesh_local_prefix, thread.pan_id)),
            NetworkKind::Lowpan(_) => None,
        };
        let is_thread = network.is_some();

        let (runtime, handle) =
            MeshRuntime::new(kind, config.device_id(), config.retry_policy(), |reporter| {
                let stack = SimulatedStack::new(reporter, settings, eui64);
                match network {
                    Some((prefix, pan_id)) => stack.with_network(prefix, pan_id),
                    None => stack,
                }
            });
        let node = Self {
            handle,
            task: runtime.spawn(),
        };

        if is_thread {
            let applied = node
                .handle
                .set_device_config(eui64, &config.thread.pskd)
                .await;
            if let Err(err) = applied {
                node.shutdown().await;
                return Err(err);
            }
        }

        tracing::info!(device = config.node.device_id, network = %config.node.network, "node started");
        Ok(node)
    }

    pub fn handle(&self) -> MeshHandle {
        self.handle.clone()
    }

    /// Stop the runtime and wait for it to finish.
    pub async fn shutdown(self) {
        tracing::info!("shutting down node");
        self.handle.shutdown();
        if let Err(e) = self.task.await {
            tracing::warn!("runtime task ended abnormally: {e}");
        }
        tracing::info!("node shutdown complete");
    }
}
