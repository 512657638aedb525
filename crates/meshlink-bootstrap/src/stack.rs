//! Calls the tasklet issues into the mesh network stack.

use std::net::Ipv6Addr;

use meshlink_core::{ChannelList, DeviceId, InterfaceId, LinkAddressInfo, StackError};

use crate::config::{
    AddressMode, BootstrapMode, LinkSecurity, NodeMode, ThreadDeviceConfig,
    ThreadLinkConfiguration,
};

/// The underlying 6LoWPAN/Thread stack.
///
/// Configuration calls only stage parameters; nothing happens on the radio
/// until [`interface_up`](Self::interface_up). Outcomes of a bootstrap are
/// reported asynchronously as network status events.
pub trait MeshStack {
    /// Create a network interface on an RF driver.
    fn interface_init(&mut self, device: DeviceId, name: &str) -> Result<InterfaceId, StackError>;

    fn set_bootstrap_mode(
        &mut self,
        interface: InterfaceId,
        mode: NodeMode,
        bootstrap: BootstrapMode,
    ) -> Result<(), StackError>;

    fn set_link_security(
        &mut self,
        interface: InterfaceId,
        security: &LinkSecurity,
    ) -> Result<(), StackError>;

    fn set_scan_parameters(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        duration: u8,
    ) -> Result<(), StackError>;

    /// Restrict scanning to one network id. `None` disables the filter.
    fn set_network_id_filter(
        &mut self,
        interface: InterfaceId,
        filter: Option<&[u8; 16]>,
    ) -> Result<(), StackError>;

    fn set_address_mode(
        &mut self,
        interface: InterfaceId,
        mode: AddressMode,
    ) -> Result<(), StackError>;

    fn thread_node_init(
        &mut self,
        interface: InterfaceId,
        channels: ChannelList,
        device: &ThreadDeviceConfig,
        link: &ThreadLinkConfiguration,
    ) -> Result<(), StackError>;

    /// Start the bootstrap. `Ok` means the request was accepted, not that
    /// the node is attached.
    fn interface_up(&mut self, interface: InterfaceId) -> Result<(), StackError>;

    fn interface_down(&mut self, interface: InterfaceId) -> Result<(), StackError>;

    /// Assigned global address of this node.
    fn own_address(&self, interface: InterfaceId) -> Result<Ipv6Addr, StackError>;

    /// Address of the border router this node attached through.
    fn router_address(&self, interface: InterfaceId) -> Result<Ipv6Addr, StackError>;

    fn link_address(&self, interface: InterfaceId) -> Result<LinkAddressInfo, StackError>;
}
