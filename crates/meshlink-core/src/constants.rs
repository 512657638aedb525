//! Radio, link and bootstrap constants.
//!
//! Defaults mirror the static configuration shipped with the reference mesh
//! API for sub-GHz 6LoWPAN-ND and 2.4 GHz Thread networks.

/// Channel mask covering every 2.4 GHz IEEE 802.15.4 channel (11..=26).
pub const ALL_2_4GHZ_CHANNELS: u32 = 0x07ff_f800;

/// Highest channel number representable in a 32-bit channel mask.
pub const MAX_CHANNEL: u8 = 31;

/// Default 6LoWPAN-ND scan channel.
pub const LOWPAN_DEFAULT_CHANNEL: u8 = 12;

/// Default channel page for both network kinds.
pub const DEFAULT_CHANNEL_PAGE: u8 = 0;

/// Scan duration passed to the stack, in stack-defined units.
pub const SCAN_DURATION: u8 = 5;

/// Interface name registered for 6LoWPAN-ND.
pub const LOWPAN_INTERFACE_NAME: &str = "6LND";

/// Interface name registered for Thread.
pub const THREAD_INTERFACE_NAME: &str = "6L-THREAD";

/// Default Thread RF channel.
pub const THREAD_DEFAULT_CHANNEL: u8 = 12;

/// Default Thread PAN id (57082).
pub const THREAD_DEFAULT_PAN_ID: u16 = 0xDEFA;

/// Default Thread joiner passphrase.
pub const THREAD_DEFAULT_PSKD: &str = "Secret password";

/// Minimum accepted PSKd length in characters.
pub const PSKD_MIN_LEN: usize = 6;

/// Default Thread network name.
pub const THREAD_DEFAULT_NETWORK_NAME: &str = "Arm Powered Core";

/// Maximum Thread network name length in bytes.
pub const THREAD_NETWORK_NAME_MAX: usize = 16;

/// Default Thread network master key.
pub const THREAD_DEFAULT_MASTER_KEY: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
];

/// Default Thread mesh-local ULA prefix (`fd00:db8::/64`).
pub const THREAD_DEFAULT_ML_PREFIX: [u8; 8] = [0xfd, 0x00, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00];

/// Default Thread commissioning credential.
pub const THREAD_DEFAULT_PSKC: [u8; 16] = THREAD_DEFAULT_MASTER_KEY;

/// Beacon protocol id advertised by Thread nodes.
pub const THREAD_PROTOCOL_ID: u8 = 0x03;

/// Beacon protocol version advertised by Thread nodes.
pub const THREAD_PROTOCOL_VERSION: u8 = 1;

/// Master key rotation interval in seconds.
pub const THREAD_KEY_ROTATION_SECS: u32 = 3600;

/// Locally administered bit applied to the extended random MAC.
pub const LOCALLY_ADMINISTERED_BIT: u8 = 0x02;

/// Minimum buffer length for a textual IPv6 address, terminator included.
pub const ADDRESS_STRING_MIN_LEN: usize = 40;
