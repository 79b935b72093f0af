use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Identifier of the controller device a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub [u8; 16]);

impl DeviceId {
    /// Generates a new random device ID
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        DeviceId(bytes)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Slot a paired client occupies on the device (0-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ClientSlot(u8);

impl ClientSlot {
    /// Reserved slot the pairing exchange always uses
    pub const PAIRING: ClientSlot = ClientSlot(0);

    /// Creates a client slot, rejecting values outside 0-7
    pub fn new(slot: u8) -> Result<Self> {
        if slot <= super::MAX_CLIENT_SLOT {
            Ok(ClientSlot(slot))
        } else {
            Err(Error::invalid_command(format!("client slot {} out of range", slot)))
        }
    }

    /// Returns the raw slot number
    pub fn get(&self) -> u8 {
        self.0
    }

    /// First byte of every inbound frame addressed to this slot
    pub fn notification_marker(&self) -> u8 {
        super::NOTIFICATION_MARKER_BASE + self.0
    }
}

impl TryFrom<u8> for ClientSlot {
    type Error = Error;

    fn try_from(slot: u8) -> Result<Self> {
        ClientSlot::new(slot)
    }
}

impl From<ClientSlot> for u8 {
    fn from(slot: ClientSlot) -> u8 {
        slot.0
    }
}

/// Four-byte secret shared between a paired client and the device
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientSecret(pub [u8; 4]);

impl ClientSecret {
    /// Well-known secret used only by the pairing exchange
    pub const PAIRING: ClientSecret = ClientSecret([0x54, 0xD2, 0xEE, 0x63]);

    /// Generates a fresh secret to offer when pairing
    pub fn random() -> Self {
        use rand::Rng;
        ClientSecret(rand::thread_rng().gen())
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

// Secrets stay out of logs.
impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret(****)")
    }
}

/// Slot and secret identifying a paired client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub slot: ClientSlot,
    pub secret: ClientSecret,
}

impl Credentials {
    /// Credentials every pairing frame is sent with
    pub const PAIRING: Credentials = Credentials {
        slot: ClientSlot::PAIRING,
        secret: ClientSecret::PAIRING,
    };

    pub fn new(slot: ClientSlot, secret: ClientSecret) -> Self {
        Credentials { slot, secret }
    }
}

/// Bit-set of occupied slots as reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSet(pub u16);

impl SlotSet {
    /// Returns whether the slot is occupied
    pub fn contains(&self, slot: u8) -> bool {
        slot < 16 && self.0 & (1 << slot) != 0
    }

    /// Marks a slot as occupied
    pub fn insert(&mut self, slot: u8) {
        if slot < 16 {
            self.0 |= 1 << slot;
        }
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates occupied slots in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..16u8).filter(move |slot| self.contains(*slot))
    }

    /// Lowest slot not yet occupied below `capacity`
    pub fn first_free(&self, capacity: u8) -> Option<u8> {
        (0..capacity.min(16)).find(|slot| !self.contains(*slot))
    }
}

/// Configuration for the protocol engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bytes per transport write
    pub chunk_size: usize,
    /// How long to wait for a matching notification after writing
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub notification_timeout: Duration,
    /// Outer bound on one whole exchange, writes included
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub exchange_timeout: Duration,
    /// Cooldown after water flow stops
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub lockout_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: super::CHUNK_SIZE,
            notification_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(6),
            lockout_duration: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Checks the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be non-zero"));
        }
        if self.notification_timeout.is_zero() || self.exchange_timeout.is_zero() {
            return Err(Error::config("timeouts must be non-zero"));
        }
        if self.exchange_timeout < self.notification_timeout {
            return Err(Error::config(
                "exchange_timeout must not be shorter than notification_timeout",
            ));
        }
        Ok(())
    }
}
