//! Single-consumer async runtime hosting one bootstrap tasklet.
//!
//! The [`MeshRuntime`] owns the tasklet and drains two queues: events from
//! the scheduler and the stack, and commands from [`MeshHandle`]s. Each item
//! is processed to completion before the next is taken, so the tasklet never
//! sees overlapping calls.

use std::net::Ipv6Addr;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use meshlink_bootstrap::{
    Event, MeshError, MeshStack, NetworkKind, NotificationSink, RetryPolicy, Tasklet,
    TaskletState,
};
use meshlink_core::{DeviceId, Eui64, InterfaceId, TaskletId};

use crate::error::NodeError;
use crate::scheduler::{StatusReporter, TokioScheduler};

/// Id the runtime's scheduler assigns to its tasklet.
pub const NODE_TASKLET: TaskletId = TaskletId(1);

const COMMAND_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, MeshError>>;

enum Command {
    SetDeviceConfig {
        eui64: Eui64,
        pskd: String,
        reply: Reply<()>,
    },
    Connect {
        sink: Box<dyn NotificationSink>,
        reply: Reply<InterfaceId>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    OwnAddress {
        reply: Reply<Ipv6Addr>,
    },
    RouterAddress {
        reply: Reply<Ipv6Addr>,
    },
    Status {
        reply: oneshot::Sender<TaskletState>,
    },
}

pub struct MeshRuntime<S> {
    tasklet: Tasklet<S, TokioScheduler>,
    device: DeviceId,
    /// Created on first connect and kept for later ones.
    interface: Option<InterfaceId>,
    events: mpsc::UnboundedReceiver<Event>,
    commands: mpsc::Receiver<Command>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: MeshStack + Send + 'static> MeshRuntime<S> {
    /// Build a runtime. `build_stack` receives the reporter the stack uses to
    /// deliver network status events.
    pub fn new(
        kind: NetworkKind,
        device: DeviceId,
        policy: RetryPolicy,
        build_stack: impl FnOnce(StatusReporter) -> S,
    ) -> (Self, MeshHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let stack = build_stack(StatusReporter::new(event_tx.clone(), NODE_TASKLET));
        let scheduler = TokioScheduler::new(event_tx, NODE_TASKLET);
        let runtime = Self {
            tasklet: Tasklet::with_retry_policy(kind, stack, scheduler, policy),
            device,
            interface: None,
            events: event_rx,
            commands: command_rx,
            shutdown_rx,
        };
        let handle = MeshHandle {
            commands: command_tx,
            shutdown: Arc::new(shutdown_tx),
        };
        (runtime, handle)
    }

    /// Spawn the runtime onto the current tokio runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown is signalled. An attached interface is brought down
    /// on the way out.
    pub async fn run(mut self) {
        tracing::info!(network = self.tasklet.kind().label(), "entering event loop");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    tracing::info!("shutdown signal received");
                    break;
                }

                Some(command) = self.commands.recv() => {
                    self.handle_command(command);
                }

                Some(event) = self.events.recv() => {
                    self.tasklet.handle_event(event);
                }
            }
        }

        if self.tasklet.interface().is_some()
            && let Err(err) = self.tasklet.disconnect()
        {
            tracing::warn!(%err, "disconnect during shutdown failed");
        }
        tracing::info!("runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetDeviceConfig { eui64, pskd, reply } => {
                let _ = reply.send(self.tasklet.set_device_config(eui64, &pskd));
            }
            Command::Connect { sink, reply } => {
                let _ = reply.send(self.connect(sink));
            }
            Command::Disconnect { reply } => {
                let _ = reply.send(self.tasklet.disconnect());
            }
            Command::OwnAddress { reply } => {
                let _ = reply.send(self.tasklet.own_ip_address());
            }
            Command::RouterAddress { reply } => {
                let _ = reply.send(self.tasklet.router_ip_address());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.tasklet.state());
            }
        }
    }

    fn connect(&mut self, sink: Box<dyn NotificationSink>) -> Result<InterfaceId, MeshError> {
        let interface = match self.interface {
            Some(interface) => interface,
            None => {
                let interface = self.tasklet.network_init(self.device)?;
                self.interface = Some(interface);
                interface
            }
        };
        self.tasklet.connect(Some(sink), interface)?;
        Ok(interface)
    }
}

/// Cloneable handle for driving a [`MeshRuntime`].
#[derive(Clone)]
pub struct MeshHandle {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl MeshHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| NodeError::NotStarted)?;
        rx.await.map_err(|_| NodeError::NotStarted)
    }

    /// Set the Thread device identity. Fails for 6LoWPAN-ND runtimes.
    pub async fn set_device_config(&self, eui64: Eui64, pskd: &str) -> Result<(), NodeError> {
        let pskd = pskd.to_string();
        Ok(self
            .request(|reply| Command::SetDeviceConfig { eui64, pskd, reply })
            .await??)
    }

    /// Create the interface if needed and start joining. Progress is
    /// reported to `sink`.
    pub async fn connect(
        &self,
        sink: impl NotificationSink + 'static,
    ) -> Result<InterfaceId, NodeError> {
        let sink: Box<dyn NotificationSink> = Box::new(sink);
        Ok(self.request(|reply| Command::Connect { sink, reply }).await??)
    }

    pub async fn disconnect(&self) -> Result<(), NodeError> {
        Ok(self.request(|reply| Command::Disconnect { reply }).await??)
    }

    pub async fn own_ip_address(&self) -> Result<Ipv6Addr, NodeError> {
        Ok(self.request(|reply| Command::OwnAddress { reply }).await??)
    }

    pub async fn router_ip_address(&self) -> Result<Ipv6Addr, NodeError> {
        Ok(self.request(|reply| Command::RouterAddress { reply }).await??)
    }

    pub async fn status(&self) -> Result<TaskletState, NodeError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Signal the runtime to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
