//! Simulated mesh stack for running a node without a radio.
//!
//! Each `interface_up` is answered after a fixed delay: the first
//! `scan_failures` attempts report `ScanFail`, every later one reports
//! `BootstrapReady`. Addresses are built from the mesh-local prefix and the
//! device EUI-64.

use std::net::Ipv6Addr;
use std::time::Duration;

use tokio::task::JoinHandle;

use meshlink_bootstrap::config::{
    AddressMode, BootstrapMode, LinkSecurity, NodeMode, ThreadDeviceConfig,
    ThreadLinkConfiguration,
};
use meshlink_bootstrap::{MeshStack, StackStatus};
use meshlink_core::constants::{THREAD_DEFAULT_ML_PREFIX, THREAD_DEFAULT_PAN_ID};
use meshlink_core::{
    ChannelList, DeviceId, Eui64, InterfaceId, LinkAddressInfo, MeshLocalPrefix, PanId, StackError,
};

use crate::scheduler::StatusReporter;

/// Interface identifier of the simulated border router.
const ROUTER_IID: Eui64 = Eui64::new([0, 0, 0, 0, 0, 0, 0, 1]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    pub scan_failures: u32,
    pub response_delay: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            scan_failures: 1,
            response_delay: Duration::from_millis(1000),
        }
    }
}

pub struct SimulatedStack {
    reporter: StatusReporter,
    settings: SimulationSettings,
    eui64: Eui64,
    prefix: MeshLocalPrefix,
    pan_id: PanId,
    interfaces: u8,
    attempts: u32,
    up: Option<InterfaceId>,
    pending: Option<JoinHandle<()>>,
}

impl SimulatedStack {
    pub fn new(reporter: StatusReporter, settings: SimulationSettings, eui64: Eui64) -> Self {
        Self {
            reporter,
            settings,
            eui64,
            prefix: MeshLocalPrefix::new(THREAD_DEFAULT_ML_PREFIX),
            pan_id: PanId(THREAD_DEFAULT_PAN_ID),
            interfaces: 0,
            attempts: 0,
            up: None,
            pending: None,
        }
    }

    pub fn with_network(mut self, prefix: MeshLocalPrefix, pan_id: PanId) -> Self {
        self.prefix = prefix;
        self.pan_id = pan_id;
        self
    }

    /// `interface_up` calls seen since the last `interface_down`.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn check(&self, interface: InterfaceId) -> Result<(), StackError> {
        if interface.0 == 0 || interface.0 > self.interfaces {
            return Err(StackError::InvalidParameter);
        }
        Ok(())
    }

    fn attached(&self, interface: InterfaceId) -> Result<(), StackError> {
        match self.up {
            Some(up) if up == interface => Ok(()),
            _ => Err(StackError::AddressUnavailable),
        }
    }
}

impl MeshStack for SimulatedStack {
    fn interface_init(&mut self, device: DeviceId, name: &str) -> Result<InterfaceId, StackError> {
        self.interfaces = self
            .interfaces
            .checked_add(1)
            .ok_or(StackError::OutOfMemory)?;
        let interface = InterfaceId(self.interfaces);
        tracing::debug!(%interface, name, device = device.0, "simulated interface created");
        Ok(interface)
    }

    fn set_bootstrap_mode(
        &mut self,
        interface: InterfaceId,
        mode: NodeMode,
        bootstrap: BootstrapMode,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        tracing::trace!(%interface, ?mode, ?bootstrap, "bootstrap mode");
        Ok(())
    }

    fn set_link_security(
        &mut self,
        interface: InterfaceId,
        security: &LinkSecurity,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        tracing::trace!(%interface, ?security, "link security");
        Ok(())
    }

    fn set_scan_parameters(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        duration: u8,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        tracing::trace!(%interface, ?channels, duration, "scan parameters");
        Ok(())
    }

    fn set_network_id_filter(
        &mut self,
        interface: InterfaceId,
        filter: Option<&[u8; 16]>,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        tracing::trace!(%interface, filtered = filter.is_some(), "network id filter");
        Ok(())
    }

    fn set_address_mode(
        &mut self,
        interface: InterfaceId,
        mode: AddressMode,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        tracing::trace!(%interface, ?mode, "address mode");
        Ok(())
    }

    fn thread_node_init(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        device: &ThreadDeviceConfig,
        link: &ThreadLinkConfiguration,
    ) -> Result<(), StackError> {
        self.check(interface)?;
        self.eui64 = device.eui64;
        self.prefix = link.mesh_local_prefix;
        self.pan_id = link.pan_id;
        tracing::trace!(%interface, ?channels, pan_id = %link.pan_id, "thread node init");
        Ok(())
    }

    fn interface_up(&mut self, interface: InterfaceId) -> Result<(), StackError> {
        self.check(interface)?;
        self.abort_pending();
        self.attempts = self.attempts.saturating_add(1);
        self.up = None;

        let status = if self.attempts <= self.settings.scan_failures {
            StackStatus::ScanFail
        } else {
            StackStatus::BootstrapReady
        };
        if status == StackStatus::BootstrapReady {
            self.up = Some(interface);
        }

        let reporter = self.reporter.clone();
        let delay = self.settings.response_delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reporter.report(status);
        }));
        Ok(())
    }

    fn interface_down(&mut self, interface: InterfaceId) -> Result<(), StackError> {
        self.check(interface)?;
        self.abort_pending();
        self.attempts = 0;
        self.up = None;
        Ok(())
    }

    fn own_address(&self, interface: InterfaceId) -> Result<Ipv6Addr, StackError> {
        self.attached(interface)?;
        Ok(self.prefix.address_with_iid(&self.eui64.locally_administered()))
    }

    fn router_address(&self, interface: InterfaceId) -> Result<Ipv6Addr, StackError> {
        self.attached(interface)?;
        Ok(self.prefix.address_with_iid(&ROUTER_IID))
    }

    fn link_address(&self, interface: InterfaceId) -> Result<LinkAddressInfo, StackError> {
        self.attached(interface)?;
        Ok(LinkAddressInfo {
            pan_id: self.pan_id,
            short_address: u16::from(interface.0),
            mac64: self.eui64,
            iid: self.eui64.locally_administered(),
        })
    }
}

impl Drop for SimulatedStack {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
