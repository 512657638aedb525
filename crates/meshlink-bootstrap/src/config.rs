//! Link configuration snapshots for each supported network kind.
//!
//! A [`NetworkKind`] selects which configuration branch the tasklet runs when
//! it brings the interface up. The values are plain data: validation of
//! caller input happens where the configuration is built.

use meshlink_core::constants::{
    DEFAULT_CHANNEL_PAGE, LOWPAN_DEFAULT_CHANNEL, LOWPAN_INTERFACE_NAME, THREAD_DEFAULT_CHANNEL,
    THREAD_DEFAULT_ML_PREFIX, THREAD_DEFAULT_MASTER_KEY, THREAD_DEFAULT_NETWORK_NAME,
    THREAD_DEFAULT_PAN_ID, THREAD_DEFAULT_PSKC, THREAD_INTERFACE_NAME, THREAD_KEY_ROTATION_SECS,
    THREAD_NETWORK_NAME_MAX, THREAD_PROTOCOL_ID, THREAD_PROTOCOL_VERSION,
};
use meshlink_core::{
    ChannelList, ChannelMask, Eui64, MasterKey, MeshLocalPrefix, PanId, Pskc, Pskd,
};

/// Role the node takes in the mesh.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NodeMode {
    #[default]
    Router,
    Host,
    SleepyHost,
}

/// Bootstrap procedure the stack runs on interface up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapMode {
    /// 6LoWPAN neighbor discovery with MLE.
    NdWithMle,
    Thread,
}

/// Global address allocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// 16-bit short address derived global prefix address.
    Gp16 { short_address: u16, generate_dynamic: bool },
    Gp64,
}

/// Link-layer security for 6LoWPAN-ND.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum LinkSecurity {
    #[default]
    None,
    Psk { key_id: u8, key: [u8; 16] },
}

impl std::fmt::Debug for LinkSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Psk { key_id, .. } => f
                .debug_struct("Psk")
                .field("key_id", key_id)
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Thread device type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ThreadDeviceType {
    #[default]
    Router,
    SleepyEndDevice,
}

impl ThreadDeviceType {
    pub const fn node_mode(&self) -> NodeMode {
        match self {
            Self::Router => NodeMode::Router,
            Self::SleepyEndDevice => NodeMode::SleepyHost,
        }
    }
}

/// 6LoWPAN-ND link parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowpanConfig {
    pub channels: ChannelList,
    pub mode: NodeMode,
    pub security: LinkSecurity,
}

impl Default for LowpanConfig {
    fn default() -> Self {
        Self {
            channels: ChannelList {
                page: DEFAULT_CHANNEL_PAGE,
                mask: ChannelMask::from_bits(1 << LOWPAN_DEFAULT_CHANNEL),
            },
            mode: NodeMode::Router,
            security: LinkSecurity::None,
        }
    }
}

/// Per-device Thread identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDeviceConfig {
    pub eui64: Eui64,
    pub pskd: Pskd,
    pub leader_capable: bool,
}

/// Thread network parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadConfig {
    pub device_type: ThreadDeviceType,
    pub channels: ChannelList,
    pub rf_channel: u8,
    pub pan_id: PanId,
    pub network_name: String,
    pub master_key: MasterKey,
    pub mesh_local_prefix: MeshLocalPrefix,
    pub pskc: Pskc,
    /// Unset until the application supplies its EUI-64 and PSKd.
    pub device: Option<ThreadDeviceConfig>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            device_type: ThreadDeviceType::Router,
            channels: ChannelList {
                page: DEFAULT_CHANNEL_PAGE,
                mask: ChannelMask::ALL_2_4GHZ,
            },
            rf_channel: THREAD_DEFAULT_CHANNEL,
            pan_id: PanId(THREAD_DEFAULT_PAN_ID),
            network_name: THREAD_DEFAULT_NETWORK_NAME.to_string(),
            master_key: MasterKey::new(THREAD_DEFAULT_MASTER_KEY),
            mesh_local_prefix: MeshLocalPrefix::new(THREAD_DEFAULT_ML_PREFIX),
            pskc: Pskc::new(THREAD_DEFAULT_PSKC),
            device: None,
        }
    }
}

/// Link configuration handed to the stack when starting a Thread node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadLinkConfiguration {
    pub name: [u8; THREAD_NETWORK_NAME_MAX],
    pub pan_id: PanId,
    pub rf_channel: u8,
    pub channel_page: u8,
    pub protocol_id: u8,
    pub version: u8,
    pub extended_random_mac: Eui64,
    pub mesh_local_prefix: MeshLocalPrefix,
    pub master_key: MasterKey,
    pub pskc: Pskc,
    pub key_rotation_secs: u32,
    pub key_sequence: u32,
    pub steering_data: Vec<u8>,
}

impl ThreadConfig {
    /// Build the stack link configuration for the given device.
    ///
    /// The network name is truncated (or zero-padded) to 16 bytes and the
    /// extended random MAC is the device EUI-64 with the locally
    /// administered bit set.
    pub fn link_configuration(&self, device: &ThreadDeviceConfig) -> ThreadLinkConfiguration {
        let mut name = [0u8; THREAD_NETWORK_NAME_MAX];
        let raw = self.network_name.as_bytes();
        let len = raw.len().min(THREAD_NETWORK_NAME_MAX);
        name[..len].copy_from_slice(&raw[..len]);

        ThreadLinkConfiguration {
            name,
            pan_id: self.pan_id,
            rf_channel: self.rf_channel,
            channel_page: self.channels.page,
            protocol_id: THREAD_PROTOCOL_ID,
            version: THREAD_PROTOCOL_VERSION,
            extended_random_mac: device.eui64.locally_administered(),
            mesh_local_prefix: self.mesh_local_prefix,
            master_key: self.master_key.clone(),
            pskc: self.pskc.clone(),
            key_rotation_secs: THREAD_KEY_ROTATION_SECS,
            key_sequence: 0,
            steering_data: Vec::new(),
        }
    }
}

/// Network kind and its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkKind {
    Lowpan(LowpanConfig),
    Thread(ThreadConfig),
}

impl NetworkKind {
    /// Interface name registered with the stack for this kind.
    pub const fn interface_name(&self) -> &'static str {
        match self {
            Self::Lowpan(_) => LOWPAN_INTERFACE_NAME,
            Self::Thread(_) => THREAD_INTERFACE_NAME,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Lowpan(_) => "6lowpan-nd",
            Self::Thread(_) => "thread",
        }
    }
}
