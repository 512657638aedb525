//! TOML-based configuration for a meshlink node.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use meshlink_bootstrap::config::{LinkSecurity, LowpanConfig, NodeMode, ThreadConfig, ThreadDeviceType};
use meshlink_bootstrap::{NetworkKind, RetryPolicy};
use meshlink_core::constants::{
    ALL_2_4GHZ_CHANNELS, DEFAULT_CHANNEL_PAGE, LOWPAN_DEFAULT_CHANNEL, THREAD_DEFAULT_CHANNEL,
    THREAD_DEFAULT_NETWORK_NAME, THREAD_DEFAULT_PAN_ID, THREAD_DEFAULT_PSKD,
};
use meshlink_core::{
    ChannelList, ChannelMask, DeviceId, Eui64, MasterKey, MeshLocalPrefix, PanId, Pskc,
};

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub lowpan: LowpanSection,
    #[serde(default)]
    pub thread: ThreadSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId(self.node.device_id)
    }

    /// Build the network kind selected by `[node] network`.
    pub fn network_kind(&self) -> Result<NetworkKind, NodeError> {
        match self.node.network.to_lowercase().as_str() {
            "6lowpan" | "lowpan" | "nd" => Ok(NetworkKind::Lowpan(self.lowpan.to_config()?)),
            "thread" => Ok(NetworkKind::Thread(self.thread.to_config()?)),
            other => Err(NodeError::Config(format!("unknown network kind: {other}"))),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = match self.retry.max_attempts {
            Some(max) => RetryPolicy::bounded(max),
            None => RetryPolicy::unbounded(),
        };
        policy.with_delay(Duration::from_millis(self.retry.delay_ms))
    }

    /// EUI-64 of this device: `[thread] eui64` if set, otherwise derived
    /// from the RF device id.
    pub fn eui64(&self) -> Result<Eui64, NodeError> {
        match &self.thread.eui64 {
            Some(hex) => Ok(Eui64::new(parse_hex("thread.eui64", hex)?)),
            None => Ok(Eui64::new([
                0x00,
                0x00,
                0x00,
                0xff,
                0xfe,
                0x00,
                0x00,
                self.node.device_id,
            ])),
        }
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// RF driver the interface is created on.
    #[serde(default)]
    pub device_id: u8,
    /// `"6lowpan"` or `"thread"`.
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    "6lowpan".to_string()
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            device_id: 0,
            network: default_network(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `[lowpan]` section.
#[derive(Debug, Deserialize)]
pub struct LowpanSection {
    #[serde(default = "default_lowpan_channel")]
    pub channel: u8,
    /// Overrides `channel` when set.
    pub channel_mask: Option<u32>,
    #[serde(default)]
    pub channel_page: u8,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_security")]
    pub security: String,
    /// 32 hex characters. Required when `security = "psk"`.
    pub psk_key: Option<String>,
    #[serde(default = "default_psk_key_id")]
    pub psk_key_id: u8,
}

fn default_lowpan_channel() -> u8 {
    LOWPAN_DEFAULT_CHANNEL
}

fn default_mode() -> String {
    "router".to_string()
}

fn default_security() -> String {
    "none".to_string()
}

fn default_psk_key_id() -> u8 {
    1
}

impl Default for LowpanSection {
    fn default() -> Self {
        Self {
            channel: default_lowpan_channel(),
            channel_mask: None,
            channel_page: DEFAULT_CHANNEL_PAGE,
            mode: default_mode(),
            security: default_security(),
            psk_key: None,
            psk_key_id: default_psk_key_id(),
        }
    }
}

impl LowpanSection {
    fn to_config(&self) -> Result<LowpanConfig, NodeError> {
        let mask = match self.channel_mask {
            Some(bits) => ChannelMask::from_bits(bits),
            None => ChannelMask::single(self.channel).ok_or_else(|| {
                NodeError::Config(format!("lowpan.channel out of range: {}", self.channel))
            })?,
        };
        if mask.is_empty() {
            return Err(NodeError::Config("lowpan.channel_mask is empty".into()));
        }

        let security = match self.security.to_lowercase().as_str() {
            "none" => LinkSecurity::None,
            "psk" => {
                let hex = self.psk_key.as_deref().ok_or_else(|| {
                    NodeError::Config("lowpan.psk_key is required for psk security".into())
                })?;
                LinkSecurity::Psk {
                    key_id: self.psk_key_id,
                    key: parse_hex("lowpan.psk_key", hex)?,
                }
            }
            other => {
                return Err(NodeError::Config(format!(
                    "unknown lowpan security mode: {other}"
                )));
            }
        };

        Ok(LowpanConfig {
            channels: ChannelList {
                page: self.channel_page,
                mask,
            },
            mode: parse_node_mode(&self.mode)?,
            security,
        })
    }
}

/// The `[thread]` section.
#[derive(Debug, Deserialize)]
pub struct ThreadSection {
    /// `"router"` or `"sed"`.
    #[serde(default = "default_device_type")]
    pub device_type: String,
    #[serde(default = "default_thread_mask")]
    pub channel_mask: u32,
    #[serde(default = "default_thread_channel")]
    pub channel: u8,
    #[serde(default)]
    pub channel_page: u8,
    #[serde(default = "default_pan_id")]
    pub pan_id: u16,
    #[serde(default = "default_pskd")]
    pub pskd: String,
    /// 16 hex characters.
    pub eui64: Option<String>,
    /// 32 hex characters.
    pub master_key: Option<String>,
    /// 16 hex characters.
    pub mesh_local_prefix: Option<String>,
    /// 32 hex characters.
    pub pskc: Option<String>,
    #[serde(default = "default_network_name")]
    pub network_name: String,
}

fn default_device_type() -> String {
    "router".to_string()
}

fn default_thread_mask() -> u32 {
    ALL_2_4GHZ_CHANNELS
}

fn default_thread_channel() -> u8 {
    THREAD_DEFAULT_CHANNEL
}

fn default_pan_id() -> u16 {
    THREAD_DEFAULT_PAN_ID
}

fn default_pskd() -> String {
    THREAD_DEFAULT_PSKD.to_string()
}

fn default_network_name() -> String {
    THREAD_DEFAULT_NETWORK_NAME.to_string()
}

impl Default for ThreadSection {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            channel_mask: default_thread_mask(),
            channel: default_thread_channel(),
            channel_page: DEFAULT_CHANNEL_PAGE,
            pan_id: default_pan_id(),
            pskd: default_pskd(),
            eui64: None,
            master_key: None,
            mesh_local_prefix: None,
            pskc: None,
            network_name: default_network_name(),
        }
    }
}

impl ThreadSection {
    fn to_config(&self) -> Result<ThreadConfig, NodeError> {
        let device_type = match self.device_type.to_lowercase().as_str() {
            "router" => ThreadDeviceType::Router,
            "sed" | "sleepy_end_device" => ThreadDeviceType::SleepyEndDevice,
            other => {
                return Err(NodeError::Config(format!(
                    "unknown thread device type: {other}"
                )));
            }
        };
        let mask = ChannelMask::from_bits(self.channel_mask);
        if !mask.contains(self.channel) {
            return Err(NodeError::Config(format!(
                "thread.channel {} is not in thread.channel_mask",
                self.channel
            )));
        }

        let defaults = ThreadConfig::default();
        Ok(ThreadConfig {
            device_type,
            channels: ChannelList {
                page: self.channel_page,
                mask,
            },
            rf_channel: self.channel,
            pan_id: PanId(self.pan_id),
            network_name: self.network_name.clone(),
            master_key: match &self.master_key {
                Some(hex) => MasterKey::new(parse_hex("thread.master_key", hex)?),
                None => defaults.master_key.clone(),
            },
            mesh_local_prefix: match &self.mesh_local_prefix {
                Some(hex) => MeshLocalPrefix::new(parse_hex("thread.mesh_local_prefix", hex)?),
                None => defaults.mesh_local_prefix,
            },
            pskc: match &self.pskc {
                Some(hex) => Pskc::new(parse_hex("thread.pskc", hex)?),
                None => defaults.pskc.clone(),
            },
            device: None,
        })
    }
}

/// The `[retry]` section.
#[derive(Debug, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    /// Absent means retry until success or disconnect.
    pub max_attempts: Option<u32>,
}

fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay_ms(),
            max_attempts: None,
        }
    }
}

/// The `[simulation]` section, driving the simulated mesh stack.
#[derive(Debug, Deserialize)]
pub struct SimulationSection {
    /// Scan failures reported before the simulated network answers.
    #[serde(default = "default_scan_failures")]
    pub scan_failures: u32,
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,
}

fn default_scan_failures() -> u32 {
    1
}

fn default_response_delay_ms() -> u64 {
    1000
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            scan_failures: default_scan_failures(),
            response_delay_ms: default_response_delay_ms(),
        }
    }
}

/// Parse a node mode string to a [`NodeMode`].
pub fn parse_node_mode(s: &str) -> Result<NodeMode, NodeError> {
    match s.to_lowercase().as_str() {
        "router" => Ok(NodeMode::Router),
        "host" => Ok(NodeMode::Host),
        "sleepy_host" | "sleepyhost" => Ok(NodeMode::SleepyHost),
        other => Err(NodeError::Config(format!("unknown node mode: {other}"))),
    }
}

/// Decode a fixed-length hex string.
fn parse_hex<const N: usize>(field: &str, s: &str) -> Result<[u8; N], NodeError> {
    let bytes = hex::decode(s).map_err(|e| NodeError::Config(format!("invalid hex in {field}: {e}")))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        NodeError::Config(format!("{field} must be {N} bytes, got {len}"))
    })
}
