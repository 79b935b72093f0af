//! Core types shared across the protocol engine
//! 
//! This module contains identifiers, credentials, configuration and the error taxonomy.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, ExchangeStage, PeripheralFault, Result};
pub use self::types::{
    ClientSecret,
    ClientSlot,
    Config,
    Credentials,
    DeviceId,
    SlotSet,
};

/// Bytes per transport write
pub const CHUNK_SIZE: usize = 20;

/// Highest client slot a device hands out
pub const MAX_CLIENT_SLOT: u8 = 7;

/// Inbound frames start with this value plus the addressed client slot
pub const NOTIFICATION_MARKER_BASE: u8 = 0x40;

/// Second byte of every inbound frame
pub const NOTIFICATION_STATUS: u8 = 0x01;

/// Header bytes preceding every payload: slot/marker, opcode/status, length
pub const FRAME_HEADER_LEN: usize = 3;
