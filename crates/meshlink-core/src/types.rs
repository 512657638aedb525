//! Newtype wrappers for identifiers and link parameters.
//!
//! These types keep radio channel masks, PAN ids and the various 8- and
//! 16-byte credentials apart even though they share raw representations.

use core::fmt;
use std::net::Ipv6Addr;

use crate::constants::{ALL_2_4GHZ_CHANNELS, LOCALLY_ADMINISTERED_BIT, MAX_CHANNEL, PSKD_MIN_LEN};
use crate::error::InvalidLength;

fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// Handle of the RF driver registered with the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u8);

/// Handle of a network interface created inside the mesh stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u8);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Identifier of an event handler registered with the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskletId(pub u8);

impl fmt::Display for TaskletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tasklet{}", self.0)
    }
}

/// Bit mask of radio channels, bit `n` selecting channel `n`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// Every 2.4 GHz channel.
    pub const ALL_2_4GHZ: ChannelMask = ChannelMask(ALL_2_4GHZ_CHANNELS);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask selecting a single channel, or `None` if the channel is out of range.
    pub fn single(channel: u8) -> Option<Self> {
        (channel <= MAX_CHANNEL).then(|| Self(1 << channel))
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, channel: u8) -> bool {
        channel <= MAX_CHANNEL && self.0 & (1 << channel) != 0
    }

    /// Iterate over the selected channel numbers in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=MAX_CHANNEL).filter(|ch| self.contains(*ch))
    }
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelMask(0x{:08x})", self.0)
    }
}

/// Channel page together with the channels to scan on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelList {
    pub page: u8,
    pub mask: ChannelMask,
}

/// IEEE 802.15.4 PAN identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanId(pub u16);

impl fmt::Display for PanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl fmt::Debug for PanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PanId({self})")
    }
}

/// A 64-bit extended unique identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Eui64(pub(crate) [u8; 8]);

impl Eui64 {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Copy with the locally administered bit set in the first octet.
    pub fn locally_administered(&self) -> Self {
        let mut bytes = self.0;
        bytes[0] |= LOCALLY_ADMINISTERED_BIT;
        Self(bytes)
    }
}

impl AsRef<[u8]> for Eui64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Eui64 {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eui64(")?;
        fmt_hex(&self.0, f)?;
        write!(f, ")")
    }
}

/// A 64-bit mesh-local ULA prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshLocalPrefix(pub(crate) [u8; 8]);

impl MeshLocalPrefix {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Combine the prefix with an interface identifier into a full address.
    pub fn address_with_iid(&self, iid: &Eui64) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets[..8].copy_from_slice(&self.0);
        octets[8..].copy_from_slice(&iid.0);
        Ipv6Addr::from(octets)
    }
}

impl TryFrom<&[u8]> for MeshLocalPrefix {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for MeshLocalPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self.address_with_iid(&Eui64([0; 8]));
        write!(f, "MeshLocalPrefix({addr}/64)")
    }
}

/// A 16-byte Thread network master key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey([u8; 16]);

impl MasterKey {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for MasterKey {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MasterKey").field(&"[REDACTED]").finish()
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}

/// A 16-byte Thread commissioner credential (PSKc). Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Pskc([u8; 16]);

impl Pskc {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Pskc {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Pskc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pskc").field(&"[REDACTED]").finish()
    }
}

/// Joiner passphrase (PSKd) used for Thread commissioning.
#[derive(Clone, PartialEq, Eq)]
pub struct Pskd(String);

impl Pskd {
    /// Validate and wrap a passphrase. Rejects anything shorter than
    /// [`PSKD_MIN_LEN`] characters.
    pub fn new(passphrase: impl Into<String>) -> Result<Self, InvalidLength> {
        let passphrase = passphrase.into();
        let len = passphrase.chars().count();
        if len < PSKD_MIN_LEN {
            return Err(InvalidLength {
                expected: PSKD_MIN_LEN,
                actual: len,
            });
        }
        Ok(Self(passphrase))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pskd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pskd").field(&"[REDACTED]").finish()
    }
}

/// Link-layer addressing read back from the stack once attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddressInfo {
    pub pan_id: PanId,
    pub short_address: u16,
    pub mac64: Eui64,
    /// Interface identifier derived from the 64-bit MAC.
    pub iid: Eui64,
}
