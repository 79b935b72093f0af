//! Protocol implementation module
//!
//! This module defines the shower controller's commands and notifications,
//! their wire encoding, frame reassembly, and the device runtime state machine.

pub mod association;
pub mod codec;
pub mod command;
pub mod notification;
pub mod reassembler;
pub mod state;

pub use self::codec::{chunk, decode, encode, CommandCodec};
pub use self::command::{
    Command, CommandBody, CommandKind, DeviceSettings, Outlet, PresetDetails, RunningMode,
};
pub use self::notification::{
    DeviceInformation, Notification, NotificationBody, NotificationKind, OutletSettings,
    ReportedState, TechnicalInformation, ValveState,
};
pub use self::reassembler::FrameReassembler;
pub use self::state::{DeviceRuntimeState, RunningState};

/// Command opcodes
pub mod opcode {
    pub const PAIRING: u8 = 0xEB;
    pub const REQUEST_NICKNAME: u8 = 0x44;
    pub const UPDATE_NICKNAME: u8 = 0x45;
    pub const REQUEST_STATE: u8 = 0x07;
    pub const REQUEST_DEVICE_INFORMATION: u8 = 0x3B;
    pub const REQUEST_DEVICE_SETTINGS: u8 = 0x3E;
    pub const UPDATE_DEVICE_SETTINGS: u8 = 0x3F;
    pub const PRESETS: u8 = 0x30;
    pub const UPDATE_PRESET_DETAILS: u8 = 0x35;
    pub const DELETE_PRESET_DETAILS: u8 = 0x36;
    pub const START_PRESET: u8 = 0xB1;
    pub const REQUEST_OUTLET_SETTINGS: u8 = 0x10;
    pub const UPDATE_OUTLET_SETTINGS: u8 = 0x11;
    pub const OPERATE_OUTLET_CONTROLS: u8 = 0x87;
    pub const PAIRED_CLIENTS: u8 = 0x6B;
    pub const SYSTEM: u8 = 0xF4;
    pub const REQUEST_TECHNICAL_INFORMATION: u8 = 0x32;
}

/// Field widths of NUL-padded strings
pub const PRESET_NAME_WIDTH: usize = 16;
pub const NICKNAME_WIDTH: usize = 16;
pub const CLIENT_NAME_WIDTH: usize = 20;

/// One-byte results at or above this value report failure
pub const FAILURE_THRESHOLD: u8 = 0x80;

/// Outlet byte value meaning "on" in outlet controls
pub const OUTLET_ON: u8 = 0x64;

/// Running-state bytes shared by controls and state payloads
pub const RUNNING_OFF: u8 = 0x00;
pub const RUNNING_ON: u8 = 0x01;
pub const RUNNING_PAUSED: u8 = 0x03;

/// Offsets applied to slot selectors in query payloads
pub const PRESET_SELECTOR_BASE: u8 = 0x40;
pub const CLIENT_SELECTOR_BASE: u8 = 0x10;

/// Subcommands of the system opcode
pub const SYSTEM_RESTART: u8 = 0x01;
pub const SYSTEM_FACTORY_RESET: u8 = 0x02;
