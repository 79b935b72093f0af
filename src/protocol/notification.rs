use serde::{Deserialize, Serialize};

use crate::core::{ClientSlot, DeviceId, SlotSet};
use super::command::{DeviceSettings, Outlet, PresetDetails};

/// Water-flow state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportedState {
    Off,
    Running,
    Paused,
}

/// Live valve state carried by state and controls notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveState {
    pub state: ReportedState,
    pub target_temperature: f64,
    pub actual_temperature: f64,
    pub first_outlet: bool,
    pub second_outlet: bool,
    pub remaining_seconds: u16,
    /// Incremented by the device on every accepted update
    pub update_counter: u8,
}

impl ValveState {
    /// The outlet currently delivering water, first outlet preferred
    pub fn active_outlet(&self) -> Option<Outlet> {
        if self.first_outlet {
            Some(Outlet::First)
        } else if self.second_outlet {
            Some(Outlet::Second)
        } else {
            None
        }
    }
}

/// Fixed identity data of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInformation {
    pub device_type: u8,
    pub outlet_count: u8,
    pub preset_capacity: u8,
    pub client_capacity: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
}

/// Per-outlet limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletSettings {
    pub outlet: Outlet,
    pub maximum_duration_seconds: u32,
    pub maximum_temperature: f64,
    pub minimum_temperature: f64,
    pub threshold_temperature: f64,
}

/// Hardware and firmware revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalInformation {
    pub valve_type: u16,
    pub valve_software_version: u16,
    pub ui_type: u16,
    pub ui_software_version: u16,
    pub bluetooth_software_version: u16,
}

/// Variant-specific content of a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationBody {
    Success,
    Failure {
        code: u8,
    },
    PairSuccess {
        client_slot: ClientSlot,
    },
    UnpairSuccess {
        client_slot: ClientSlot,
    },
    PresetSlots {
        slots: SlotSet,
    },
    DeviceInformation(DeviceInformation),
    DeviceSettings(DeviceSettings),
    DeviceState(ValveState),
    ControlsOperated {
        valve: ValveState,
        preset_slot: u8,
    },
    OutletSettings(OutletSettings),
    Nickname {
        nickname: String,
    },
    PresetDetails(PresetDetails),
    PairedClientSlots {
        slots: SlotSet,
    },
    PairedClientDetails {
        client_slot: ClientSlot,
        name: String,
    },
    TechnicalInformation(TechnicalInformation),
    Unknown {
        payload: Vec<u8>,
    },
}

/// Discriminant of [`NotificationBody`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Failure,
    PairSuccess,
    UnpairSuccess,
    PresetSlots,
    DeviceInformation,
    DeviceSettings,
    DeviceState,
    ControlsOperated,
    OutletSettings,
    Nickname,
    PresetDetails,
    PairedClientSlots,
    PairedClientDetails,
    TechnicalInformation,
    Unknown,
}

impl NotificationBody {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationBody::Success => NotificationKind::Success,
            NotificationBody::Failure { .. } => NotificationKind::Failure,
            NotificationBody::PairSuccess { .. } => NotificationKind::PairSuccess,
            NotificationBody::UnpairSuccess { .. } => NotificationKind::UnpairSuccess,
            NotificationBody::PresetSlots { .. } => NotificationKind::PresetSlots,
            NotificationBody::DeviceInformation(_) => NotificationKind::DeviceInformation,
            NotificationBody::DeviceSettings(_) => NotificationKind::DeviceSettings,
            NotificationBody::DeviceState(_) => NotificationKind::DeviceState,
            NotificationBody::ControlsOperated { .. } => NotificationKind::ControlsOperated,
            NotificationBody::OutletSettings(_) => NotificationKind::OutletSettings,
            NotificationBody::Nickname { .. } => NotificationKind::Nickname,
            NotificationBody::PresetDetails(_) => NotificationKind::PresetDetails,
            NotificationBody::PairedClientSlots { .. } => NotificationKind::PairedClientSlots,
            NotificationBody::PairedClientDetails { .. } => NotificationKind::PairedClientDetails,
            NotificationBody::TechnicalInformation(_) => NotificationKind::TechnicalInformation,
            NotificationBody::Unknown { .. } => NotificationKind::Unknown,
        }
    }
}

/// A decoded result of one completed exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub device_id: DeviceId,
    pub body: NotificationBody,
}

impl Notification {
    pub fn new(device_id: DeviceId, body: NotificationBody) -> Self {
        Notification { device_id, body }
    }

    pub fn kind(&self) -> NotificationKind {
        self.body.kind()
    }

    /// Valve state, if this notification carries one
    pub fn valve_state(&self) -> Option<&ValveState> {
        match &self.body {
            NotificationBody::DeviceState(valve) => Some(valve),
            NotificationBody::ControlsOperated { valve, .. } => Some(valve),
            _ => None,
        }
    }
}
